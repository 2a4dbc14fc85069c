use crate::config::Config;
use reclaim_common::{ReclaimError, Result};
use reclaim_logger::severity::LogSeverity::{Error, Fatal, Info};
use reclaim_logger::{debug, log, DebugLevel};
use reclaim_region::spawn_chunk;
use std::collections::{BTreeMap, HashMap};

/// A source of chunk protection, typically a land-claim system.
pub trait ProtectionHook {
    /// Unique name, also the key under `hooks` in the configuration.
    fn protection_name(&self) -> &str;

    /// Whether whatever the hook wraps is installed at all. A hook without its dependencies
    /// is skipped quietly.
    fn dependencies_present(&self) -> bool {
        true
    }

    /// A hook that is not ready yet is retried on later flag sweeps.
    fn is_ready_on_enable(&self) -> bool {
        true
    }

    /// `false` means protection data cannot be trusted, which pauses every deletion.
    fn is_hook_usable(&self) -> bool;

    fn is_chunk_protected(&self, world: &str, chunk_x: i32, chunk_z: i32) -> bool;
}

pub type HookFactory = Box<dyn Fn(&Config) -> Box<dyn ProtectionHook>>;

/// Named constructors for every hook the process knows about.
pub struct HookRegistry {
    factories: BTreeMap<String, HookFactory>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in hooks.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SPAWN_HOOK, |config| {
            Box::new(SpawnProtectionHook::from_config(config))
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Config) -> Box<dyn ProtectionHook> + 'static,
    {
        self.factories.insert(name.to_owned(), Box::new(factory));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds every enabled hook. Returns the resulting set and the names of hooks that
    /// reported themselves unusable.
    pub fn activate(&self, config: &Config) -> (ProtectionHooks, Vec<String>) {
        let mut hooks = ProtectionHooks::default();
        let mut failures = Vec::new();

        for name in config.hook_names(self.names()) {
            if !config.hook_enabled(&name) {
                debug(DebugLevel::Low, || format!("Hook {} is disabled", name));
                continue;
            }
            let Some(factory) = self.factories.get(&name) else {
                log(format!("No hook found for {}", name), Error);
                continue;
            };
            let hook = factory(config);
            if !hook.dependencies_present() {
                debug(DebugLevel::Low, || {
                    format!("Dependencies for hook {} are missing, skipping it", name)
                });
                continue;
            }
            if !hook.is_ready_on_enable() {
                debug(DebugLevel::Low, || {
                    format!("Hook {} is not ready yet, will retry", name)
                });
                hooks.pending.push(hook);
                continue;
            }
            if hook.is_hook_usable() {
                log(format!("Enabled protection hook {}", name), Info);
                hooks.active.push(hook);
            } else {
                log(
                    format!("Protection hook {} is unusable, pausing deletion", name),
                    Fatal,
                );
                failures.push(name);
            }
        }
        (hooks, failures)
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// The hooks consulted during deletion, plus those still waiting to become ready.
#[derive(Default)]
pub struct ProtectionHooks {
    active: Vec<Box<dyn ProtectionHook>>,
    pending: Vec<Box<dyn ProtectionHook>>,
}

impl ProtectionHooks {
    pub fn any_protects(&self, world: &str, chunk_x: i32, chunk_z: i32) -> bool {
        self.active
            .iter()
            .any(|hook| hook.is_chunk_protected(world, chunk_x, chunk_z))
    }

    /// Each active hook's answer for one chunk.
    pub fn verdicts(&self, world: &str, chunk_x: i32, chunk_z: i32) -> Vec<(String, bool)> {
        self.active
            .iter()
            .map(|hook| {
                (
                    hook.protection_name().to_owned(),
                    hook.is_chunk_protected(world, chunk_x, chunk_z),
                )
            })
            .collect()
    }

    pub fn active_names(&self) -> Vec<String> {
        self.active
            .iter()
            .map(|hook| hook.protection_name().to_owned())
            .collect()
    }

    pub fn pending_names(&self) -> Vec<String> {
        self.pending
            .iter()
            .map(|hook| hook.protection_name().to_owned())
            .collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.active
            .iter()
            .chain(self.pending.iter())
            .any(|hook| hook.protection_name() == name)
    }

    pub fn add(&mut self, hook: Box<dyn ProtectionHook>) -> Result<()> {
        let name = hook.protection_name().to_owned();
        if self.contains(&name) {
            return Err(ReclaimError::HookError(format!(
                "a hook named {} is already registered",
                name
            )));
        }
        if !hook.is_hook_usable() {
            return Err(ReclaimError::HookError(format!("hook {} is unusable", name)));
        }
        log(format!("Added protection hook {}", name), Info);
        self.active.push(hook);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.active.len() + self.pending.len();
        self.active.retain(|hook| hook.protection_name() != name);
        self.pending.retain(|hook| hook.protection_name() != name);
        before != self.active.len() + self.pending.len()
    }

    /// Moves pending hooks that became ready into the active set. Returns the names of
    /// those that became ready but are unusable; they are dropped.
    pub fn promote_ready(&mut self) -> Vec<String> {
        let mut failures = Vec::new();
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|hook| hook.is_ready_on_enable());
        self.pending = waiting;

        for hook in ready {
            let name = hook.protection_name().to_owned();
            if hook.is_hook_usable() {
                log(format!("Enabled protection hook {}", name), Info);
                self.active.push(hook);
            } else {
                log(
                    format!("Protection hook {} is unusable, pausing deletion", name),
                    Fatal,
                );
                failures.push(name);
            }
        }
        failures
    }
}

pub const SPAWN_HOOK: &str = "Spawn";

/// Protects a square of chunks around each world's spawn point.
pub struct SpawnProtectionHook {
    spawns: HashMap<String, (i32, i32)>,
    radius: i32,
}

impl SpawnProtectionHook {
    pub fn new(radius: i32) -> Self {
        Self {
            spawns: HashMap::new(),
            radius,
        }
    }

    pub fn with_spawn(mut self, world: &str, chunk_x: i32, chunk_z: i32) -> Self {
        self.spawns.insert(world.to_owned(), (chunk_x, chunk_z));
        self
    }

    /// Reads the spawn of every enabled world from its `level.dat` under the world container.
    /// Worlds without a readable `level.dat` get no protection.
    pub fn from_config(config: &Config) -> Self {
        let mut hook = Self::new(config.spawn_chunk_radius);
        for world in &config.worlds {
            match spawn_chunk(&config.world_container.join(world)) {
                Ok((x, z)) => hook = hook.with_spawn(world, x, z),
                Err(err) => debug(DebugLevel::Low, || {
                    format!("No spawn protection for {}: {}", world, err)
                }),
            }
        }
        hook
    }
}

impl ProtectionHook for SpawnProtectionHook {
    fn protection_name(&self) -> &str {
        SPAWN_HOOK
    }

    fn is_hook_usable(&self) -> bool {
        true
    }

    fn is_chunk_protected(&self, world: &str, chunk_x: i32, chunk_z: i32) -> bool {
        if self.radius <= 0 {
            return false;
        }
        self.spawns.get(world).map_or(false, |&(x, z)| {
            (chunk_x - x).abs() <= self.radius && (chunk_z - z).abs() <= self.radius
        })
    }
}
