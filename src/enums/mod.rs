pub(crate) mod status;
mod version;

pub use self::status::Status;
pub use self::version::Version;
