use crate::error::MigrationError;
use crate::handler::VersionMap;

/// Store migrations run on every upgrade. Implementations must be idempotent.
pub trait ModuleMigrations {
    fn run_migrations(&mut self, from_vm: &VersionMap) -> Result<VersionMap, MigrationError>;

    fn migrate_params(&mut self, module: &str) -> Result<(), MigrationError>;
}

/// Leaves every module at its current version. Used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughMigrations;

impl ModuleMigrations for PassThroughMigrations {
    fn run_migrations(&mut self, from_vm: &VersionMap) -> Result<VersionMap, MigrationError> {
        Ok(from_vm.clone())
    }

    fn migrate_params(&mut self, _module: &str) -> Result<(), MigrationError> {
        Ok(())
    }
}

impl<M: ModuleMigrations + ?Sized> ModuleMigrations for &mut M {
    fn run_migrations(&mut self, from_vm: &VersionMap) -> Result<VersionMap, MigrationError> {
        (**self).run_migrations(from_vm)
    }

    fn migrate_params(&mut self, module: &str) -> Result<(), MigrationError> {
        (**self).migrate_params(module)
    }
}
