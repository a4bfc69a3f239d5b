pub mod lister;

pub use lister::AssetLister;
