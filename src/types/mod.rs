//! Spearal value model: the dynamic value graph moved through the codec.

mod bean;
mod big_number;
mod datetime;
mod value;

pub use bean::{Bean, BeanRef, DynamicBean, UnsupportedBean};
pub use big_number::{BigNumber, BIG_NUMBER_ALPHABET};
pub use datetime::{Date, DateTime, Time};
pub use value::{CustomValue, EnumValue, ObjectId, Shared, Value};
