//! Storage drivers for filehub.
//!
//! One [`BackendDriver`](filehub_storage_core::BackendDriver) per backend kind:
//! - `local`: direct filesystem access
//! - `smb`: SMB/CIFS share mounted on first use, then served as local files
//! - `cloud`: WebDAV over HTTP (`webdav` holds the protocol client)
//! - `adb`: Android device over `adb shell` (`ls_listing` holds the parser)
//!
//! Plus the two process-backed seams the drivers and OCR rely on:
//! `command::CommandRunner` and `ocr::TextExtractor`.

pub mod adb;
pub mod cloud;
pub mod command;
pub mod local;
pub mod ls_listing;
pub mod ocr;
pub mod smb;
pub mod webdav;

pub use adb::{AdbOptions, AndroidDriver};
pub use cloud::CloudDriver;
pub use command::{CommandError, CommandRunner, ProcessRunner};
pub use local::LocalDriver;
pub use ocr::{is_image, TesseractExtractor, TextExtractor, IMAGE_EXTENSIONS};
pub use smb::{MountOptions, NasDriver};
