// Domain layer - Plain data types shared by every other layer
pub mod statistics;
pub mod time_of_day;
pub mod weather;
pub mod window;
