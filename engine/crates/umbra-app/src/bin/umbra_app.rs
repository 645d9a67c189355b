use std::process::ExitCode;

use umbra_app::winit_app::WinitApp;

fn main() -> ExitCode {
    match WinitApp::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}
