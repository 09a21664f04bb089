//! Implements the analog I/O half of a serial firmware protocol.
//!
//! A host drives the firmware one message at a time over a serial link.
//! The transport strips the framing and hands over a complete message:
//! one opcode byte followed by fixed-width little-endian fields. This
//! crate decodes those messages, runs the matching analog operation
//! against the board's hardware capabilities and sends back replies for
//! query commands, so that you can bring the protocol up on new boards
//! without rewriting the command handling!

#![no_std]

// ****************************************************************************
//
// Imports
//
// ****************************************************************************

use byteorder::{ByteOrder, LittleEndian};

// ****************************************************************************
//
// Public Types
//
// ****************************************************************************

/// The command set a firmware build supports. The base profile only has
/// the pin read/write commands; the extended profile adds tone
/// generation. Opcodes outside the active profile are not decoded.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Profile {
    Base,
    Extended,
}

/// Commands in the analog command set. The firmware decodes these and a
/// host-side tool encodes them.
#[derive(Debug, PartialEq)]
pub enum Command {
    /// Sample the analog input on a pin. The payload is one byte of pin
    /// number. The converter's reading is sent back widened to 16 bits,
    /// unscaled, in a `Reply::ReadPin`.
    ReadPin { pin: u8 },
    /// Drive the analog (PWM) output on a pin. The payload is one byte
    /// of pin number followed by one byte of output value. No reply.
    WritePin { pin: u8, value: u8 },
    /// Start square-wave generation on a pin. The payload is one byte
    /// of pin number, 4 bytes of frequency and 4 bytes of duration. A
    /// zero duration plays until `NoTonePin` stops it; anything else
    /// plays for that many time units and stops by itself. No reply.
    /// Extended profile only.
    TonePin {
        pin: u8,
        frequency: u32,
        duration: u32,
    },
    /// Stop square-wave generation on a pin, whether or not a tone is
    /// playing. The payload is one byte of pin number. No reply.
    /// Extended profile only.
    NoTonePin { pin: u8 },
}

/// Replies sent back to the host. The firmware encodes these and a
/// host-side tool decodes them.
#[derive(Debug, PartialEq)]
pub enum Reply {
    /// The reading taken for a `Command::ReadPin`, as 2 bytes of
    /// little-endian value after the opcode.
    ReadPin { value: u16 },
}

#[derive(Debug, PartialEq)]
pub enum Error {
    /// The opcode is not part of the active profile's command set.
    UnknownCommand,
    /// The message is shorter than the opcode's payload layout needs.
    Truncated,
    /// The output buffer is too small for the encoded message.
    Overflow,
}

/// The hardware capabilities the command handlers run against. Pin
/// numbers are passed straight through; whether a pin exists or
/// supports the operation is the implementation's concern, as is any
/// hardware fault handling.
pub trait Board {
    /// Sample the analog input on `pin`. The reading keeps the
    /// converter's native resolution, widened into the 16-bit value.
    fn analog_read(&mut self, pin: u8) -> u16;
    /// Write an 8-bit value to the analog (PWM) output on `pin`.
    fn analog_write(&mut self, pin: u8, value: u8);
    /// Start a square wave on `pin` that plays until `no_tone`.
    fn tone(&mut self, pin: u8, frequency: u32);
    /// Start a square wave on `pin` that stops itself after `duration`
    /// time units.
    fn timed_tone(&mut self, pin: u8, frequency: u32, duration: u32);
    /// Stop whatever square wave `pin` is playing, if any.
    fn no_tone(&mut self, pin: u8);
}

/// Where replies go. The transport owns the link and the framing; the
/// handlers only hand it an opcode and the encoded result value.
pub trait ReplyPort {
    /// Queue one reply for transmission: the opcode byte followed by
    /// `payload`.
    fn send_reply(&mut self, opcode: u8, payload: &[u8]);
}

// ****************************************************************************
//
// Public Data
//
// ****************************************************************************

// None

// ****************************************************************************
//
// Private Types
//
// ****************************************************************************

// None

// ****************************************************************************
//
// Private Data
//
// ****************************************************************************

const ALG_CMD_READ_PIN: u8 = 0x30;
const ALG_CMD_WRITE_PIN: u8 = 0x31;
const ALG_CMD_TONE_PIN: u8 = 0x32;
const ALG_CMD_NOTONE_PIN: u8 = 0x33;

const ALG_RESP_READ_PIN: u8 = 0x38;

// ****************************************************************************
//
// Public Impl/Functions/Modules
//
// ****************************************************************************

/// Decode and execute one analog command message.
///
/// This is the firmware-side entry point. The transport calls it once
/// per received message with the complete buffer; exactly one handler
/// runs, invokes its capability on `board` and, for query commands,
/// pushes one reply through `port`. The returned flag tells the caller
/// whether the message needs further processing, which no analog
/// command does.
///
/// A message shorter than its opcode's layout fails with
/// `Error::Truncated` before anything is invoked. An opcode outside the
/// profile's command set is ignored apart from a log line: no
/// capability runs and no reply is sent.
pub fn handle_message(
    profile: Profile,
    msg: &[u8],
    board: &mut impl Board,
    port: &mut impl ReplyPort,
) -> Result<bool, Error> {
    let command = match Command::decode(profile, msg) {
        Ok(command) => command,
        Err(Error::UnknownCommand) => {
            log::warn!("ignoring unknown analog command {:#04x}", msg[0]);
            return Ok(false);
        }
        Err(e) => return Err(e),
    };
    match command {
        Command::ReadPin { pin } => {
            let value = board.analog_read(pin);
            let mut payload = [0u8; 2];
            LittleEndian::write_u16(&mut payload, value);
            port.send_reply(ALG_RESP_READ_PIN, &payload);
        }
        Command::WritePin { pin, value } => {
            board.analog_write(pin, value);
        }
        Command::TonePin {
            pin,
            frequency,
            duration,
        } => {
            if duration == 0 {
                board.tone(pin, frequency);
            } else {
                board.timed_tone(pin, frequency, duration);
            }
        }
        Command::NoTonePin { pin } => {
            board.no_tone(pin);
        }
    }
    Ok(false)
}

impl Command {
    /// Length of the longest command message, in bytes.
    pub const MAX_LEN: usize = 10;

    /// Decode one command message.
    ///
    /// `msg` is the complete message as the transport delivers it: the
    /// opcode byte followed by the payload. The length is checked
    /// against the opcode's layout before any field is read; bytes past
    /// the layout are ignored.
    pub fn decode(profile: Profile, msg: &[u8]) -> Result<Command, Error> {
        match *msg.first().ok_or(Error::Truncated)? {
            ALG_CMD_READ_PIN => {
                let payload = payload(msg, 1)?;
                Ok(Command::ReadPin { pin: payload[0] })
            }
            ALG_CMD_WRITE_PIN => {
                let payload = payload(msg, 2)?;
                Ok(Command::WritePin {
                    pin: payload[0],
                    value: payload[1],
                })
            }
            ALG_CMD_TONE_PIN if profile == Profile::Extended => {
                let payload = payload(msg, 9)?;
                Ok(Command::TonePin {
                    pin: payload[0],
                    frequency: LittleEndian::read_u32(&payload[1..5]),
                    duration: LittleEndian::read_u32(&payload[5..9]),
                })
            }
            ALG_CMD_NOTONE_PIN if profile == Profile::Extended => {
                let payload = payload(msg, 1)?;
                Ok(Command::NoTonePin { pin: payload[0] })
            }
            _ => Err(Error::UnknownCommand),
        }
    }

    /// Encode this command into `out`, returning the number of bytes
    /// written. This is the host side of the protocol; the firmware
    /// never encodes commands.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, Error> {
        match *self {
            Command::ReadPin { pin } => {
                let out = out.get_mut(..2).ok_or(Error::Overflow)?;
                out[0] = ALG_CMD_READ_PIN;
                out[1] = pin;
                Ok(2)
            }
            Command::WritePin { pin, value } => {
                let out = out.get_mut(..3).ok_or(Error::Overflow)?;
                out[0] = ALG_CMD_WRITE_PIN;
                out[1] = pin;
                out[2] = value;
                Ok(3)
            }
            Command::TonePin {
                pin,
                frequency,
                duration,
            } => {
                let out = out.get_mut(..10).ok_or(Error::Overflow)?;
                out[0] = ALG_CMD_TONE_PIN;
                out[1] = pin;
                LittleEndian::write_u32(&mut out[2..6], frequency);
                LittleEndian::write_u32(&mut out[6..10], duration);
                Ok(10)
            }
            Command::NoTonePin { pin } => {
                let out = out.get_mut(..2).ok_or(Error::Overflow)?;
                out[0] = ALG_CMD_NOTONE_PIN;
                out[1] = pin;
                Ok(2)
            }
        }
    }
}

impl Reply {
    /// Length of the longest reply message, in bytes.
    pub const MAX_LEN: usize = 3;

    /// Decode one reply message. This is the host side of the protocol;
    /// the firmware never decodes replies.
    pub fn decode(msg: &[u8]) -> Result<Reply, Error> {
        match *msg.first().ok_or(Error::Truncated)? {
            ALG_RESP_READ_PIN => {
                let payload = payload(msg, 2)?;
                Ok(Reply::ReadPin {
                    value: LittleEndian::read_u16(payload),
                })
            }
            _ => Err(Error::UnknownCommand),
        }
    }

    /// Encode this reply into `out`, returning the number of bytes
    /// written.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, Error> {
        match *self {
            Reply::ReadPin { value } => {
                let out = out.get_mut(..3).ok_or(Error::Overflow)?;
                out[0] = ALG_RESP_READ_PIN;
                LittleEndian::write_u16(&mut out[1..3], value);
                Ok(3)
            }
        }
    }
}

// ****************************************************************************
//
// Private Impl/Functions/Modules
//
// ****************************************************************************

/// Borrow the `need` payload bytes after the opcode, checking the
/// message is long enough to hold them.
fn payload(msg: &[u8], need: usize) -> Result<&[u8], Error> {
    msg.get(1..1 + need).ok_or(Error::Truncated)
}


// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
