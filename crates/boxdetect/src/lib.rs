#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use boxdetect_image as image;

#[doc(inline)]
pub use boxdetect_imgproc as imgproc;
