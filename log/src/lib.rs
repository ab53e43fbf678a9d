use std::env;

use log::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;

/// Crates addressed by the `coil` meta-target.
pub static COIL_MODULES: &[&str] = &[
    "coil_collections",
    "coil_log",
    "coil_test_log",
];

pub const ENV: &str = "RUST_LOG";

/// The pseudo target that expands to every module in [`COIL_MODULES`].
pub const META_TARGET: &str = "coil";

pub trait TargetsExt {
    fn with_coil_targets(self, level: LevelFilter) -> Self;
    fn with_env(self) -> Self;
    fn with_directives(self, directives: &str) -> Self;
}

impl TargetsExt for Targets {
    fn with_coil_targets(mut self, level: LevelFilter) -> Targets {
        for &module in COIL_MODULES.iter() {
            self = self.with_target(module, level);
        }
        self
    }

    fn with_env(self) -> Targets {
        match env::var(ENV) {
            Ok(directives) => self.with_directives(&directives),
            Err(env::VarError::NotPresent) => self,
            Err(env::VarError::NotUnicode(_)) => panic!("env var {ENV} contains non-UTF-8 value"),
        }
    }

    /// Applies comma separated `target=level` or bare `level` directives.
    /// Invalid directives are skipped.
    fn with_directives(mut self, directives: &str) -> Targets {
        for directive in directives.split(',').map(str::trim) {
            if directive.is_empty() {
                continue;
            }
            let (target, level) = match directive.split_once('=') {
                Some((target, level)) => (Some(target), level),
                None => (None, directive),
            };
            let level: LevelFilter = match level.parse() {
                Ok(l) => l,
                Err(_) => continue,
            };
            self = match target {
                Some(META_TARGET) => self.with_coil_targets(level),
                Some(target) => self.with_target(target, level),
                None => self.with_default(level),
            };
        }
        self
    }
}
