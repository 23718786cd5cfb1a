use std::{borrow::Cow, fmt};

use super::metadata::MethodDef;

/// Parameter type as reported by the runtime metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamType {
    pub name: Cow<'static, str>,
    pub by_ref: bool
}

impl ParamType {
    pub const fn by_value(name: &'static str) -> ParamType {
        ParamType { name: Cow::Borrowed(name), by_ref: false }
    }

    pub const fn by_ref(name: &'static str) -> ParamType {
        ParamType { name: Cow::Borrowed(name), by_ref: true }
    }

    pub fn new(name: impl Into<Cow<'static, str>>, by_ref: bool) -> ParamType {
        ParamType { name: name.into(), by_ref }
    }

    /// An expected name without a namespace matches any namespace.
    pub fn accepts(&self, actual: &ParamType) -> bool {
        if self.by_ref != actual.by_ref {
            return false;
        }

        if self.name.contains('.') {
            self.name == actual.name
        }
        else {
            actual.name.rsplit('.').next() == Some(self.name.as_ref())
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.by_ref {
            f.write_str("ref ")?;
        }
        f.write_str(&self.name)
    }
}

/// Ordered parameter list of a method, not counting the implicit receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FunctionSignature {
    params: Vec<ParamType>
}

impl FunctionSignature {
    pub fn new(params: impl IntoIterator<Item = ParamType>) -> FunctionSignature {
        FunctionSignature {
            params: params.into_iter().collect()
        }
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Structural comparison against the parameters of a candidate method.
    pub fn accepts(&self, actual: &FunctionSignature) -> bool {
        self.params.len() == actual.params.len() &&
        self.params.iter().zip(&actual.params).all(|(expected, actual)| expected.accepts(actual))
    }

    pub fn matches(&self, method: &MethodDef) -> bool {
        self.accepts(&method.signature)
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_names_must_match_exactly() {
        let expected = ParamType::by_ref("Unity.Physics.CollisionWorld");
        assert!(expected.accepts(&ParamType::new("Unity.Physics.CollisionWorld", true)));
        assert!(!expected.accepts(&ParamType::new("Other.CollisionWorld", true)));
        assert!(!expected.accepts(&ParamType::new("Unity.Physics.CollisionWorld", false)));
    }

    #[test]
    fn short_names_ignore_namespace() {
        let expected = ParamType::by_ref("CursorPosition");
        assert!(expected.accepts(&ParamType::new("ProjectM.CursorPosition", true)));
        assert!(expected.accepts(&ParamType::new("CursorPosition", true)));
        assert!(!expected.accepts(&ParamType::new("ProjectM.CursorPositionSystem", true)));
    }

    #[test]
    fn signature_compares_order_and_length() {
        let expected = FunctionSignature::new([ParamType::by_ref("A"), ParamType::by_value("System.Int32")]);

        assert!(expected.accepts(&FunctionSignature::new([
            ParamType::new("N.A", true),
            ParamType::new("System.Int32", false)
        ])));
        assert!(!expected.accepts(&FunctionSignature::new([
            ParamType::new("System.Int32", false),
            ParamType::new("N.A", true)
        ])));
        assert!(!expected.accepts(&FunctionSignature::new([ParamType::new("N.A", true)])));
    }

    #[test]
    fn display() {
        let sig = FunctionSignature::new([ParamType::by_ref("A"), ParamType::by_value("B")]);
        assert_eq!(sig.to_string(), "(ref A, B)");
        assert_eq!(FunctionSignature::default().to_string(), "()");
    }
}
