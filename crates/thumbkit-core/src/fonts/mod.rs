mod cjk;
mod scan;
mod system;

pub use scan::{cjk_ratio, is_cjk, FontFace};
pub use system::{FontFamilies, FontSet};

pub(crate) use scan::split_text_by_face;
