pub mod enums;
pub mod explanation;
pub mod finding;
pub mod report;

pub use enums::*;
pub use explanation::*;
pub use finding::*;
pub use report::*;
