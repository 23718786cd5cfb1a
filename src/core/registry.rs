use fnv::{FnvHashMap, FnvHashSet};

use super::{detour::DetourHandle, Error};

pub enum HookOutcome {
    Installed,
    Skipped,
    Failed(Error)
}

impl HookOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, HookOutcome::Installed)
    }
}

/// Hooks installed by one initialization pass, keyed by logical name.
///
/// Every install attempt is recorded in order; a failure never stops the attempts that follow.
#[derive(Default)]
pub struct HookRegistry {
    disabled_hooks: FnvHashSet<String>,
    outcomes: Vec<(String, HookOutcome)>,
    handles: FnvHashMap<String, DetourHandle>
}

impl HookRegistry {
    pub fn new<I, S>(disabled_hooks: I) -> HookRegistry
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        HookRegistry {
            disabled_hooks: disabled_hooks.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Runs `create` unless `name` is disabled or already installed. Returns whether a hook
    /// was installed.
    pub fn install<F>(&mut self, name: &str, create: F) -> bool
    where
        F: FnOnce() -> Result<DetourHandle, Error>
    {
        if self.disabled_hooks.contains(name) {
            info!("{}: disabled in config", name);
            self.outcomes.push((name.to_owned(), HookOutcome::Skipped));
            return false;
        }

        if self.handles.contains_key(name) {
            let e = Error::HookingError(format!("{} is already registered", name));
            warn!("{}: {}", name, e);
            self.outcomes.push((name.to_owned(), HookOutcome::Failed(e)));
            return false;
        }

        match create() {
            Ok(handle) => {
                info!("{}: installed at {}", name, handle.resolution());
                self.handles.insert(name.to_owned(), handle);
                self.outcomes.push((name.to_owned(), HookOutcome::Installed));
                true
            }
            Err(e) => {
                error!("{}: {}", name, e);
                self.outcomes.push((name.to_owned(), HookOutcome::Failed(e)));
                false
            }
        }
    }

    pub fn outcomes(&self) -> &[(String, HookOutcome)] {
        &self.outcomes
    }

    pub fn handle(&self, name: &str) -> Option<&DetourHandle> {
        self.handles.get(name)
    }

    /// Trampoline of a live hook, or 0.
    pub fn trampoline(&self, name: &str) -> usize {
        self.handles.get(name).map(|h| h.trampoline_addr()).unwrap_or(0)
    }

    pub fn installed_count(&self) -> usize {
        self.handles.values().filter(|h| !h.is_disposed()).count()
    }

    /// True when no attempt failed. Skipped hooks do not count as failures.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| !matches!(outcome, HookOutcome::Failed(_)))
    }

    pub fn failures(&self) -> Vec<(&str, &Error)> {
        self.outcomes.iter()
            .filter_map(|(name, outcome)| match outcome {
                HookOutcome::Failed(e) => Some((name.as_str(), e)),
                _ => None
            })
            .collect()
    }

    /// Disposes every live hook. Returns how many were removed by this call; hooks that could
    /// not be removed stay live and are retried on the next call.
    pub fn dispose_all(&mut self) -> usize {
        let mut removed = 0;
        for (name, handle) in self.handles.iter_mut() {
            match handle.dispose() {
                Ok(true) => {
                    debug!("{}: disposed", name);
                    removed += 1;
                }
                Ok(false) => (),
                Err(e) => error!("{}: failed to dispose: {}", name, e)
            }
        }
        removed
    }
}
