//! The three services and their characteristics.

use super::characteristic::{Characteristic, Properties};
use super::codec::{ZERO_SENTINEL, encode_i16};
use super::uuids;
use crate::config::DeviceConfig;

/// Credential handshake characteristics.
#[derive(Debug)]
pub struct AuthService {
    pub username: Characteristic,
    pub password: Characteristic,
    pub token: Characteristic,
    pub response: Characteristic,
}

impl AuthService {
    pub fn new() -> Self {
        Self {
            username: Characteristic::new(
                uuids::AUTH_USERNAME,
                Properties::WRITE_NOTIFY,
                &ZERO_SENTINEL,
            ),
            password: Characteristic::new(
                uuids::AUTH_PASSWORD,
                Properties::WRITE_NOTIFY,
                &ZERO_SENTINEL,
            ),
            token: Characteristic::new(uuids::AUTH_TOKEN, Properties::READ_NOTIFY, &ZERO_SENTINEL),
            response: Characteristic::new(
                uuids::AUTH_RESPONSE,
                Properties::READ_WRITE_NOTIFY,
                &ZERO_SENTINEL,
            ),
        }
    }

    pub fn all(&self) -> [&Characteristic; 4] {
        [&self.username, &self.password, &self.token, &self.response]
    }
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new()
    }
}

/// Command channel characteristics.
#[derive(Debug)]
pub struct RunService {
    pub command: Characteristic,
    pub response: Characteristic,
}

impl RunService {
    pub fn new() -> Self {
        Self {
            command: Characteristic::new(
                uuids::RUN_COMMAND,
                Properties::READ_WRITE_NOTIFY,
                &ZERO_SENTINEL,
            ),
            response: Characteristic::new(
                uuids::RUN_RESPONSE,
                Properties::READ_NOTIFY,
                &ZERO_SENTINEL,
            ),
        }
    }

    pub fn all(&self) -> [&Characteristic; 2] {
        [&self.command, &self.response]
    }
}

impl Default for RunService {
    fn default() -> Self {
        Self::new()
    }
}

/// Stepper get/set pairs. All values are little-endian `int16`.
#[derive(Debug)]
pub struct StepperService {
    pub get_state: Characteristic,
    pub get_step: Characteristic,
    pub get_count: Characteristic,
    pub get_run: Characteristic,
    pub set_step: Characteristic,
    pub set_count: Characteristic,
    pub set_run: Characteristic,
    pub set_reset: Characteristic,
}

impl StepperService {
    pub fn new(config: &DeviceConfig) -> Self {
        let get = |uuid, v: i16| Characteristic::new(uuid, Properties::READ_NOTIFY, &encode_i16(v));
        let set =
            |uuid, v: i16| Characteristic::new(uuid, Properties::READ_WRITE_NOTIFY, &encode_i16(v));

        Self {
            get_state: get(uuids::STEPPER_GET_STATE, config.initial_state),
            get_step: get(uuids::STEPPER_GET_STEP, config.initial_step),
            get_count: get(uuids::STEPPER_GET_COUNT, config.initial_count),
            get_run: get(uuids::STEPPER_GET_RUN, 0),
            set_step: set(uuids::STEPPER_SET_STEP, config.initial_step),
            set_count: set(uuids::STEPPER_SET_COUNT, config.initial_count),
            set_run: set(uuids::STEPPER_SET_RUN, 0),
            set_reset: set(uuids::STEPPER_SET_RESET, 0),
        }
    }

    pub fn all(&self) -> [&Characteristic; 8] {
        [
            &self.get_state,
            &self.get_step,
            &self.get_count,
            &self.get_run,
            &self.set_step,
            &self.set_count,
            &self.set_run,
            &self.set_reset,
        ]
    }
}
