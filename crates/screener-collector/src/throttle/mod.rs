//! 업스트림 요청 스로틀링.

pub mod controller;
pub mod endpoint;

pub use controller::{
    ControllerSnapshot, EndpointSnapshot, Grant, Outcome, RateController, ThrottleConfig,
};
pub use endpoint::{EndpointClass, EndpointClassTable};
