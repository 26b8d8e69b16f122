pub mod create;
pub mod db;
pub mod migrate;
pub mod rollback;
pub mod serve;
pub mod status;
