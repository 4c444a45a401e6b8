mod moo_list;
mod moo_string;

pub use moo_list::List;
pub use moo_string::Str;
