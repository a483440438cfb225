mod deal;
mod point_transaction;
mod redemption;
mod shop;
mod subscription_plan;
mod user;

pub use deal::*;
pub use point_transaction::*;
pub use redemption::*;
pub use shop::*;
pub use subscription_plan::*;
pub use user::*;
