pub mod expand;
pub mod path_list;
pub mod scan;
