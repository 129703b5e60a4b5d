mod atrous;
mod gaussian;
mod variance;

pub use self::atrous::*;
pub use self::gaussian::*;
pub use self::variance::*;
