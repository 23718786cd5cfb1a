use std::{fs, path::{Path, PathBuf}, process, sync::{atomic::{self, AtomicBool}, Arc, Mutex, RwLock}};

use arc_swap::ArcSwap;
use fnv::FnvHashSet;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::il2cpp;

use super::{game::Game, listener::HookListener, registry::HookRegistry, resolver::ResolverConfig, utils, Error, Interceptor};

pub struct RetroCam {
    // Hooking stuff
    pub interceptor: Arc<Interceptor>,
    pub hooking_finished: AtomicBool,
    registry: Mutex<Option<HookRegistry>>,
    listener: RwLock<Option<Arc<dyn HookListener>>>,

    // Shared properties
    pub game: Game,
    pub config: ArcSwap<Config>
}

static INSTANCE: OnceCell<Arc<RetroCam>> = OnceCell::new();

impl RetroCam {
    pub fn init() -> bool {
        if INSTANCE.get().is_some() {
            warn!("RetroCam should be initialized only once");
            return true;
        }

        let instance = match Self::new() {
            Ok(v) => v,
            Err(e) => {
                super::log::init(false, None); // early init to log error
                error!("Init failed: {}", e);
                return false;
            }
        };

        super::log::init(instance.config.load().debug_mode, Some(&instance.game.data_dir));

        info!("RetroCam {}", env!("RETROCAM_DISPLAY_VERSION"));
        INSTANCE.set(Arc::new(instance)).is_ok()
    }

    pub fn instance() -> Arc<RetroCam> {
        INSTANCE.get().unwrap_or_else(|| {
            error!("FATAL: Attempted to get RetroCam instance before initialization");
            process::exit(1);
        }).clone()
    }

    pub fn try_instance() -> Option<Arc<RetroCam>> {
        INSTANCE.get().cloned()
    }

    fn new() -> Result<RetroCam, Error> {
        let game = Game::init();
        let config = Self::load_config(&game.data_dir)?;
        Ok(Self::with_parts(game, config, Interceptor::default()))
    }

    pub fn with_parts(game: Game, config: Config, interceptor: Interceptor) -> RetroCam {
        RetroCam {
            interceptor: Arc::new(interceptor),
            hooking_finished: AtomicBool::new(false),
            registry: Mutex::default(),
            listener: RwLock::default(),

            game,
            config: ArcSwap::new(Arc::new(config))
        }
    }

    pub fn load_config(data_dir: &Path) -> Result<Config, Error> {
        let config_path = data_dir.join("config.json");
        if fs::metadata(&config_path).is_ok() {
            let json = fs::read_to_string(&config_path)?;
            let mut config: Config = serde_json::from_str(&json)?;
            config.sanitize();
            Ok(config)
        }
        else {
            Ok(Config::default())
        }
    }

    pub fn reload_config(&self) {
        let new_config = match Self::load_config(&self.game.data_dir) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to reload config: {}", e);
                return;
            }
        };
        self.config.store(Arc::new(new_config));
    }

    pub fn save_and_reload_config(&self, mut config: Config) -> Result<(), Error> {
        config.sanitize();
        fs::create_dir_all(&self.game.data_dir)?;
        utils::write_json_file(&config, &self.get_data_path("config.json"))?;

        self.config.store(Arc::new(config));
        Ok(())
    }

    pub fn get_data_path<P: AsRef<Path>>(&self, rel_path: P) -> PathBuf {
        self.game.data_dir.join(rel_path)
    }

    pub fn set_listener(&self, listener: impl HookListener + 'static) {
        *self.listener.write().unwrap() = Some(Arc::new(listener));
    }

    pub fn clear_listener(&self) {
        *self.listener.write().unwrap() = None;
    }

    pub fn listener(&self) -> Option<Arc<dyn HookListener>> {
        self.listener.read().unwrap().clone()
    }

    /// Runs once the runtime is up and its metadata can be queried.
    pub fn on_il2cpp_initialized(&self) {
        // Prevent double initialization
        if self.hooking_finished.swap(true, atomic::Ordering::Relaxed) {
            return;
        }

        info!("il2cpp finished initializing");
        if let Err(e) = il2cpp::symbols::init() {
            error!("Failed to load il2cpp API: {}", e);
            return;
        }

        self.install_hooks();
    }

    /// Installs every camera hook into a fresh registry, removing the current one first.
    /// Returns false if any hook failed.
    pub fn install_hooks(&self) -> bool {
        self.install_hooks_with(il2cpp::hook::init)
    }

    fn install_hooks_with(&self, install: impl FnOnce(&mut HookRegistry)) -> bool {
        let mut current = self.registry.lock().unwrap();
        if !Self::dispose_registry(&mut current) {
            return false;
        }

        let config = self.config.load();
        let mut registry = HookRegistry::new(config.disabled_hooks.iter().cloned());
        install(&mut registry);

        let succeeded = registry.succeeded();
        if succeeded {
            info!("Installed {} hooks", registry.installed_count());
        }
        else {
            warn!("{} hooks failed to install", registry.failures().len());
        }

        *current = Some(registry);
        succeeded
    }

    /// Removes the camera hooks and installs them again with the current config.
    pub fn reinstall_hooks(&self) -> bool {
        self.reinstall_hooks_with(il2cpp::hook::init)
    }

    fn reinstall_hooks_with(&self, install: impl FnOnce(&mut HookRegistry)) -> bool {
        if !self.hooking_finished.load(atomic::Ordering::Relaxed) {
            warn!("Hooks can't be reinstalled before il2cpp is initialized");
            return false;
        }

        self.install_hooks_with(install)
    }

    /// Removes the camera hooks, keeping the loader hooks. Returns false if some hooks could not
    /// be removed; those stay registered.
    pub fn dispose_hooks(&self) -> bool {
        Self::dispose_registry(&mut self.registry.lock().unwrap())
    }

    fn dispose_registry(current: &mut Option<HookRegistry>) -> bool {
        let Some(registry) = current.as_mut() else {
            return true;
        };

        let removed = registry.dispose_all();
        info!("Removed {} hooks", removed);

        let remaining = registry.installed_count();
        if remaining != 0 {
            error!("{} hooks could not be removed", remaining);
            return false;
        }

        *current = None;
        true
    }

    /// Removes everything this plugin has hooked.
    pub fn dispose(&self) -> bool {
        let hooks_removed = self.dispose_hooks();
        match self.interceptor.unhook_all() {
            Ok(()) => hooks_removed,
            Err(e) => {
                error!("Failed to remove hooks: {}", e);
                false
            }
        }
    }

    pub fn with_registry<R>(&self, f: impl FnOnce(&HookRegistry) -> R) -> Option<R> {
        self.registry.lock().unwrap().as_ref().map(f)
    }
}

fn default_serde_instance<'a, T: Deserialize<'a>>() -> Option<T> {
    let empty_data = std::iter::empty::<((), ())>();
    let empty_deserializer = serde::de::value::MapDeserializer::<_, serde::de::value::Error>::new(empty_data);
    T::deserialize(empty_deserializer).ok()
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub disabled_hooks: FnvHashSet<String>,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default = "Config::default_min_zoom")]
    pub min_zoom: f32,
    #[serde(default = "Config::default_max_zoom")]
    pub max_zoom: f32,
    /// Percent of the screen width.
    #[serde(default)]
    pub aim_offset_x: f32,
    /// Percent of the screen height.
    #[serde(default)]
    pub aim_offset_y: f32
}

impl Config {
    pub const MIN_ZOOM_RANGE: (f32, f32) = (1.0, 15.0);
    pub const MAX_ZOOM_RANGE: (f32, f32) = (5.0, 30.0);
    pub const AIM_OFFSET_RANGE: (f32, f32) = (-25.0, 25.0);

    fn default_enabled() -> bool { true }
    fn default_min_zoom() -> f32 { 1.0 }
    fn default_max_zoom() -> f32 { 15.0 }

    /// Clamps values edited by hand into the ranges the camera can use.
    pub fn sanitize(&mut self) {
        let clamp = |v: f32, (min, max): (f32, f32), default: f32| {
            if v.is_finite() { v.clamp(min, max) } else { default }
        };

        self.min_zoom = clamp(self.min_zoom, Self::MIN_ZOOM_RANGE, Self::default_min_zoom());
        self.max_zoom = clamp(self.max_zoom, Self::MAX_ZOOM_RANGE, Self::default_max_zoom());
        if self.max_zoom < self.min_zoom {
            self.max_zoom = self.min_zoom.max(Self::MAX_ZOOM_RANGE.0);
        }
        self.aim_offset_x = clamp(self.aim_offset_x, Self::AIM_OFFSET_RANGE, 0.0);
        self.aim_offset_y = clamp(self.aim_offset_y, Self::AIM_OFFSET_RANGE, 0.0);

        let defaults = ResolverConfig::default();
        if self.resolver.max_hops == 0 {
            self.resolver.max_hops = defaults.max_hops;
        }
        if self.resolver.max_instructions == 0 {
            self.resolver.max_instructions = defaults.max_instructions;
        }
        if self.resolver.scan_window == 0 {
            self.resolver.scan_window = defaults.scan_window;
        }
    }

    /// Aim point offset in pixels for a screen of the given size.
    pub fn aim_offset_pixels(&self, screen_width: i32, screen_height: i32) -> (i32, i32) {
        (
            (screen_width as f32 * (self.aim_offset_x / 100.0)) as i32,
            (screen_height as f32 * (self.aim_offset_y / 100.0)) as i32
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        default_serde_instance().expect("default instance")
    }
}
