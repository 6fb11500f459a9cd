pub mod planner;
pub mod seed;
pub mod serve;
