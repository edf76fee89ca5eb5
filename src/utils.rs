pub mod compare_paths;
pub mod direction;
pub mod pairwise;
