use anyhow::Context;
use log::{debug, info, warn};
use mmwcore::source::{ByteSource, SourceError, SourceRead};
use mmwcore::RadarConfig;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPort, StopBits};

pub const SENSOR_START: &str = "sensorStart";
pub const SENSOR_STOP: &str = "sensorStop";

/// Port names and line settings for the sensor's two UARTs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub cli_port: String,
    pub data_port: String,
    pub cli_baud: u32,
    pub data_baud: u32,
    pub read_timeout_ms: u64,
    /// Pause after each uploaded command before reading the reply.
    pub command_delay_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            cli_port: "/dev/ttyUSB0".to_string(),
            data_port: "/dev/ttyUSB1".to_string(),
            cli_baud: 115_200,
            data_baud: 921_600,
            read_timeout_ms: 300,
            command_delay_ms: 10,
        }
    }
}

fn open_port(path: &str, baud: u32, timeout: Duration) -> anyhow::Result<Box<dyn SerialPort>> {
    tokio_serial::new(path, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(timeout)
        .open()
        .with_context(|| format!("opening serial port {} at {} baud", path, baud))
}

/// Command and data UARTs of one sensor.
pub struct SerialTransport {
    cli: Box<dyn SerialPort>,
    data: Box<dyn SerialPort>,
    command_delay: Duration,
}

impl SerialTransport {
    pub fn open(settings: &SerialSettings) -> anyhow::Result<Self> {
        let timeout = Duration::from_millis(settings.read_timeout_ms);
        let cli = open_port(&settings.cli_port, settings.cli_baud, timeout)?;
        let data = open_port(&settings.data_port, settings.data_baud, timeout)?;
        info!(
            "opened cli {} and data {}",
            settings.cli_port, settings.data_port
        );
        Ok(Self {
            cli,
            data,
            command_delay: Duration::from_millis(settings.command_delay_ms),
        })
    }

    /// Send one command line and return whatever the sensor echoed back.
    pub fn write_command(&mut self, command: &str) -> anyhow::Result<String> {
        self.cli
            .write_all(format!("{}\n", command).as_bytes())
            .with_context(|| format!("sending `{}`", command))?;
        self.cli.flush().context("flushing cli port")?;
        thread::sleep(self.command_delay);
        let reply = read_waiting(self.cli.as_mut()).context("reading cli reply")?;
        Ok(String::from_utf8_lossy(&reply).trim().to_string())
    }

    /// Upload every config command except `sensorStart`.
    pub fn upload_config(&mut self, radar: &RadarConfig) -> anyhow::Result<()> {
        let mut sent = 0;
        for command in radar.upload_commands() {
            let reply = self.write_command(command)?;
            debug!("{} -> {}", command, reply);
            sent += 1;
        }
        info!("uploaded {} config commands", sent);
        Ok(())
    }

    pub fn start_sensor(&mut self) -> anyhow::Result<()> {
        let reply = self.write_command(SENSOR_START)?;
        info!("{} -> {}", SENSOR_START, reply);
        Ok(())
    }

    pub fn stop_sensor(&mut self) -> anyhow::Result<()> {
        let reply = self.write_command(SENSOR_STOP)?;
        info!("{} -> {}", SENSOR_STOP, reply);
        Ok(())
    }
}

/// Read the bytes the driver reports as waiting; a timeout yields nothing.
fn read_waiting(port: &mut dyn SerialPort) -> io::Result<Vec<u8>> {
    let waiting = port.bytes_to_read().map_err(io::Error::from)? as usize;
    if waiting == 0 {
        return Ok(Vec::new());
    }
    let mut bytes = vec![0u8; waiting];
    match port.read(&mut bytes) {
        Ok(read) => {
            bytes.truncate(read);
            Ok(bytes)
        }
        Err(err) if err.kind() == io::ErrorKind::TimedOut => {
            warn!("serial read timed out with {} bytes pending", waiting);
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

impl ByteSource for SerialTransport {
    fn read_available(&mut self) -> Result<SourceRead, SourceError> {
        Ok(SourceRead::Data(read_waiting(self.data.as_mut())?))
    }
}
