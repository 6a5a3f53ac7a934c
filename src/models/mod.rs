pub mod caption;
pub mod image;

pub use self::caption::*;
pub use self::image::*;
