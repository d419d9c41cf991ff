// src/tools/mod.rs — External collaborators: interpreter, TeX, search services

pub mod datasets;
pub mod executor;
pub mod latex;
pub mod papers;

pub use datasets::{DatasetEntry, DatasetSearcher};
pub use executor::CodeExecutor;
pub use latex::LatexCompiler;
pub use papers::{Paper, PaperSearcher};
