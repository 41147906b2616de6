use std::process::ExitCode;

use anyhow::Context;
use hole::{Bundle, HoleApp, HoleError, HoleModule, StatusCode};
use hole_bootstrap::{Bootstrap, Module};

fn main() -> ExitCode {
    match run() {
        Ok(bundle) => {
            if !bundle.message().is_empty() {
                println!("{}", bundle.message());
            }
            match bundle.status_code {
                StatusCode::Null | StatusCode::Success => ExitCode::SUCCESS,
                status => exit_code(status.code()),
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<HoleError>()
                .map(HoleError::exit_code)
                .unwrap_or(StatusCode::Failure.code());
            exit_code(code)
        }
    }
}

fn run() -> anyhow::Result<Bundle> {
    let bootstrap = Bootstrap::builder()
        .modules(vec![Box::new(HoleModule) as Box<dyn Module>])
        .build();
    let provider = bootstrap.initialize().context("failed to bootstrap")?;
    let app = HoleApp::new(provider).context("failed to initialize hole")?;
    tracing::debug!("hole initialized");

    let bundle = app.execute_raw_args(std::env::args().skip(1))?;
    Ok(bundle)
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
