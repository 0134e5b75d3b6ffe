mod hkl;
mod params;

pub use hkl::{read_refl_list, read_refl_list_from_path, write_refl_list, write_refl_list_to_path};
pub use params::{write_crystal_params, write_crystal_params_to_path};
