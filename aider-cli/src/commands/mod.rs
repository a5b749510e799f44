pub mod caption;
pub mod crop;
pub mod genlist;
pub mod norfilenames;
pub mod parsetfef;
pub mod stt;
