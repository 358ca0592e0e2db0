//! 16-bit UUIDs of every service and characteristic the device exposes.
//!
//! | Service  | Characteristic | UUID     | Perms              |
//! |----------|----------------|----------|--------------------|
//! | Env      | (discovery)    | `0x1000` | -                  |
//! | Auth     | username       | `0x1011` | Write+Notify       |
//! | Auth     | password       | `0x1012` | Write+Notify       |
//! | Auth     | token          | `0x1013` | Read+Notify        |
//! | Auth     | response       | `0x1014` | Read+Write+Notify  |
//! | Run      | command        | `0x1021` | Read+Write+Notify  |
//! | Run      | response       | `0x1022` | Read+Notify        |
//! | Stepper  | get-*          | `0x1131..=0x1134` | Read+Notify |
//! | Stepper  | set-*          | `0x1232..=0x1235` | Read+Write+Notify |

/// Service advertised during discovery.
pub const ENV_SERVICE: u16 = 0x1000;

pub const AUTH_SERVICE: u16 = 0x1010;
pub const AUTH_USERNAME: u16 = 0x1011;
pub const AUTH_PASSWORD: u16 = 0x1012;
pub const AUTH_TOKEN: u16 = 0x1013;
pub const AUTH_RESPONSE: u16 = 0x1014;

pub const RUN_SERVICE: u16 = 0x1020;
pub const RUN_COMMAND: u16 = 0x1021;
pub const RUN_RESPONSE: u16 = 0x1022;

pub const STEPPER_SERVICE: u16 = 0x1030;

const GET: u16 = 0x0100;
const SET: u16 = 0x0200;

pub const STEPPER_GET_STATE: u16 = STEPPER_SERVICE + GET + 1;
pub const STEPPER_GET_STEP: u16 = STEPPER_SERVICE + GET + 2;
pub const STEPPER_GET_COUNT: u16 = STEPPER_SERVICE + GET + 3;
pub const STEPPER_GET_RUN: u16 = STEPPER_SERVICE + GET + 4;

pub const STEPPER_SET_STEP: u16 = STEPPER_SERVICE + SET + 2;
pub const STEPPER_SET_COUNT: u16 = STEPPER_SERVICE + SET + 3;
pub const STEPPER_SET_RUN: u16 = STEPPER_SERVICE + SET + 4;
pub const STEPPER_SET_RESET: u16 = STEPPER_SERVICE + SET + 5;
