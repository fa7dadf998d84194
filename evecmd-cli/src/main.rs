// A small test bed for trying out the library crates against real hardware,
// using an Excamera Labs SPIDriver connected to an EVE module. It brings the
// chip up from power-on and then draws a single test screen.
//
// Usage: evecmd-cli [SERIAL-PORT]
//
// Set RUST_LOG=trace to see every step of the initialization sequence.

use evecmd::commands::options::{defaults, FontRef, TextAlign, WidgetPos, WidgetRect};
use evecmd::config::DisplayTimings;
use evecmd::display_list::DLCmd;
use evecmd::{eve_format, Config, Delay, Eve, InitStatus, Transport};
use evecmd_spidriver::SPIDriverTransport;
use log::{error, info};
use serial_embedded_hal::{PortSettings, Serial};
use spidriver::SPIDriver;
use std::fmt::Debug;
use std::path::Path;

const DEFAULT_PORT: &str = "/dev/ttyUSB0";

struct SleepDelay;

impl Delay for SleepDelay {
    fn delay_ms(&mut self, ms: u16) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}

fn main() {
    env_logger::init();

    let port = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_PORT.to_string());
    if let Err(msg) = run(Path::new(&port)) {
        error!("{}", msg);
        std::process::exit(1);
    }
}

fn run(port: &Path) -> Result<(), String> {
    let serial = Serial::new(
        port,
        &PortSettings {
            baud_rate: serial_embedded_hal::BaudRate::BaudOther(460800),
            char_size: serial_embedded_hal::CharSize::Bits8,
            parity: serial_embedded_hal::Parity::ParityNone,
            stop_bits: serial_embedded_hal::StopBits::Stop1,
            flow_control: serial_embedded_hal::FlowControl::FlowNone,
        },
    )
    .map_err(|e| format!("can't open {}: {}", port.display(), e))?;
    let (tx, rx) = serial.split();
    let mut sd = SPIDriver::new(tx, rx);
    sd.unselect().map_err(describe("can't reset SPIDriver"))?;
    let transport = SPIDriverTransport::new(sd);

    let mut eve = Eve::new(transport, SleepDelay, Config::new(DisplayTimings::R480X272));
    match eve.init() {
        Ok(model) => info!("found {:?}", model),
        Err(err) => {
            return Err(format!(
                "initialization failed with status {:?}: {:?}",
                eve.status(),
                err
            ))
        }
    }
    if let InitStatus::Ready(model) = eve.status() {
        info!("chip is ready; generation {:?}", model.generation());
    }

    draw_test_screen(&mut eve).map_err(describe("drawing failed"))?;
    info!("test screen drawn");
    Ok(())
}

fn draw_test_screen<T: Transport>(
    eve: &mut Eve<T, SleepDelay>,
) -> evecmd::fifo::Result<(), T> {
    let (w, h) = {
        let d = &eve.config().display;
        (d.horiz.visible as i16, d.vert.visible as i16)
    };

    let cp = eve.fifo();
    cp.begin_burst()?;
    cp.dlstart()?;
    cp.dl(DLCmd::clear_color_rgb(0, 0, 64))?;
    cp.dl(DLCmd::CLEAR_ALL)?;
    cp.text(
        WidgetPos::new(w / 2, h / 3),
        FontRef::new_raw(28),
        defaults::<evecmd::commands::options::Text>().align(TextAlign::Center),
        eve_format!("%dx%d display, %d%% ready", w as i32, h as i32, 100),
    )?;
    cp.button(
        WidgetRect::new(w / 2 - 60, h / 2, 120, 40),
        FontRef::new_raw(27),
        defaults(),
        eve_format!("OK"),
    )?;
    cp.dl(DLCmd::DISPLAY)?;
    cp.swap()?;
    cp.end_burst()?;
    cp.wait_idle()
}

fn describe<E: Debug>(context: &'static str) -> impl Fn(E) -> String {
    move |e| format!("{}: {:?}", context, e)
}
