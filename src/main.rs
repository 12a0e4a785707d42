// Copyright 2020 TwoCookingMice

use macaron::core::device::Device;
use macaron::core::error::RenderError;
use macaron::core::pipeline::Pipeline;
use macaron::core::scene_desc::Property;
use macaron::core::scene_loader::load_scene;
use macaron::integrators::load_integrator;

use console::style;

use std::env;
use std::process;

struct Options {
    scene_path: String,
    spp: Option<u32>,
    threads: Option<usize>,
    display: bool,
    display_interval: Option<i64>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} <scene.xml> [--spp N] [--threads N] [--display] [--display-interval N]",
        program
    )
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let program = args.first().map(String::as_str).unwrap_or("macaron");
    let scene_path = match args.get(1) {
        Some(path) if !path.starts_with("--") => path.clone(),
        _ => return Err(usage(program)),
    };
    let mut options = Options {
        scene_path,
        spp: None,
        threads: None,
        display: false,
        display_interval: None,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--spp" => {
                i += 1;
                options.spp = Some(parse_value(args, i, "--spp")?);
            }
            "--threads" => {
                i += 1;
                options.threads = Some(parse_value(args, i, "--threads")?);
            }
            "--display" => options.display = true,
            "--display-interval" => {
                i += 1;
                options.display_interval = Some(parse_value(args, i, "--display-interval")?);
            }
            other => return Err(format!("unknown option '{}'\n{}", other, usage(program))),
        }
        i += 1;
    }
    Ok(options)
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
    args.get(i)
        .and_then(|v| v.parse::<T>().ok())
        .ok_or_else(|| format!("{} expects a number", flag))
}

fn run(options: &Options) -> Result<(), RenderError> {
    let mut scene = load_scene(&options.scene_path)?;

    if let Some(spp) = options.spp {
        for sensor in scene.sensors.iter_mut() {
            sensor.set_property("spp", Property::Integer(spp as i64));
        }
    }
    {
        let integrator = scene.integrator_mut()?;
        if options.display {
            integrator.set_property("display", Property::Bool(true));
        }
        if let Some(interval) = options.display_interval {
            integrator.set_property("display_interval", Property::Integer(interval));
        }
    }

    let device = match options.threads {
        Some(threads) => Device::new(threads),
        None => Device::with_available_parallelism(),
    };
    log::info!("Device created with {} thread(s).", device.threads());

    let pipeline = Pipeline::from_scene(device.clone(), &scene)?;
    let integrator = load_integrator(scene.integrator()?)?;
    let instance = device.with_stream(|stream| Ok(integrator.build(&pipeline, stream)))?;
    device.with_stream(|stream| instance.render(stream))
}

fn main() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", style(message).yellow());
            process::exit(1);
        }
    };

    if let Err(err) = run(&options) {
        eprintln!("{} {}", style("error:").red().bold(), err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_overrides() {
        let options = parse_args(&args(&["macaron", "scene.xml", "--spp", "8", "--threads", "3", "--display"])).unwrap();
        assert_eq!(options.scene_path, "scene.xml");
        assert_eq!(options.spp, Some(8));
        assert_eq!(options.threads, Some(3));
        assert!(options.display);
        assert_eq!(options.display_interval, None);
    }

    #[test]
    fn test_out_of_range_interval_is_left_for_clamping() {
        let large = parse_args(&args(&["macaron", "s.xml", "--display-interval", "100000"])).unwrap();
        assert_eq!(large.display_interval, Some(100000));
        let zero = parse_args(&args(&["macaron", "s.xml", "--display-interval", "0"])).unwrap();
        assert_eq!(zero.display_interval, Some(0));
        let negative = parse_args(&args(&["macaron", "s.xml", "--display-interval", "-3"])).unwrap();
        assert_eq!(negative.display_interval, Some(-3));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(parse_args(&args(&["macaron"])).is_err());
        assert!(parse_args(&args(&["macaron", "s.xml", "--spp", "many"])).is_err());
        assert!(parse_args(&args(&["macaron", "s.xml", "--frobnicate"])).is_err());
    }
}
