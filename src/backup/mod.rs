pub mod archive;
pub mod backup_config;
pub mod driver;
pub mod logger;
pub mod redacted;
pub mod repository;
pub mod result_error;
pub mod retention;
pub mod rotation;
pub mod tar;
pub mod validate;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
