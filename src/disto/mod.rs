//! The disto module contains the DISTO D8 ONLINE protocol core: token parsing,
//! line assembly, the session state machine, command dispatch and the worker
//! that owns the serial transport.

pub mod command;
pub mod device;
pub mod dispatcher;
pub mod event;
pub mod framer;
pub mod probe;
pub mod serial;
pub mod serial_mock;
pub mod session;
pub mod token;
pub mod worker;

pub use command::{AckStrategy, Command, DeviceInfoQuery, LineEnding, TrackingEffect};
pub use device::DistoDeviceHandle;
pub use dispatcher::CommandDispatcher;
pub use event::{ConnectionState, DistoEvent};
pub use framer::LineAssembler;
pub use probe::{looks_streaming, send_and_collect, ProbeClass, ProbeReport};
pub use serial::{open_serial, SerialConfig, Transport};
pub use session::{Averaging, Outgoing, ProtocolSession, SessionConfig, SessionOutput, SessionState};
pub use token::{parse_token, MeasurementWord, Sign, StatusKind, WordKind};
pub use worker::{SessionRequest, SessionWorker};
