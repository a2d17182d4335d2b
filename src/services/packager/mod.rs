pub mod deploy;
pub mod naming;
pub mod slots;

pub use deploy::{
    clean_build_dir, clean_system_patches, deploy_archive, deploy_server_tables, write_archive,
    PackEntry,
};
pub use naming::{is_system_patch, locale_archive_name, selection_slots, tabular_archive_name};
pub use slots::{all_slots, assign_slots, ALL_MODS_SLOT};

#[cfg(test)]
#[path = "tests/packager_tests.rs"]
mod tests;
