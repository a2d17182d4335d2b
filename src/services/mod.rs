pub mod archive;
pub mod baseline;
pub mod composer;
pub mod config;
pub mod csv_bridge;
pub mod dbc;
pub mod fs_utils;
pub mod migrations;
pub mod packager;
pub mod patcher;
pub mod source_overlays;
pub mod workspace;
