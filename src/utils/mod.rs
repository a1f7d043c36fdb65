pub mod class_count_cache;
pub mod db_utils;
pub mod person_filter;
