use std::collections::HashMap;
use std::fs;
use std::path::Path;

use clap::{value_parser, Arg, Command};
use log::info;
use rinex::header::Header;
use rinex::observation::HeaderFields;
use rinex::prelude::Version;
use rinex::Rinex;
use rtcmlib::{FrameResult, ParserState};

mod emit;

use emit::{build_nav_record, Emitter, NavCollector};

fn command() -> clap::Command {
    Command::new("rtcm2rnx")
        .version("1.0")
        .author("Urban Traction, Inc.")
        .about("RTCM3 to RINEX OBS/NAV converter")
        .subcommand(
            Command::new("convert")
                .about("converts an input file")
                .arg(
                    Arg::new("rinex-version")
                        .long("rinex-version")
                        .help("RINEX dialect to emit: 2 or 3")
                        .value_parser(value_parser!(u8))
                        .default_value("3"),
                )
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .help("Enable debug logging")
                        .value_parser(value_parser!(bool))
                        .default_value("false")
                        .num_args(0),
                )
                .arg(Arg::new("file_path").help("RTCM3 log file input").required(true).index(1)),
        )
}

pub fn convert_file(file_path: &str, rinex_version: u8) {
    info!("converting rtcm file: {file_path}");

    let bytes = fs::read(file_path).expect("unable to read input file");
    let mut parser = ParserState::new();
    let mut emitter = Emitter::new();
    let mut nav = NavCollector::new();

    for result in parser.feed_bytes(&bytes) {
        match result {
            FrameResult::EpochReady { epoch, valid } => emitter.push_epoch(epoch, valid),
            FrameResult::EphemerisGps(eph) => nav.gps.push(eph),
            FrameResult::EphemerisGlonass(eph) => nav.glonass.push(eph),
            FrameResult::EphemerisGalileo(eph) => nav.galileo.push(eph),
            FrameResult::Unknown(_) | FrameResult::Incomplete => {}
        }
    }

    let header_fields = HeaderFields {
        crinex: None,
        timeof_first_obs: emitter.first_epoch,
        timeof_last_obs: emitter.last_epoch,
        codes: emitter.codes.clone(),
        clock_offset_applied: false,
        scaling: HashMap::new(),
    };

    let version = if rinex_version >= 3 { Version::new(3, 0) } else { Version::new(2, 11) };
    let mut header = Header::basic_obs().with_version(version).with_observation_fields(header_fields);
    if emitter.any_epoch_invalid {
        header = header.with_comments(vec!["No valid RINEX! All values are modulo 299792.458!".to_string()]);
    }
    let record = rinex::record::Record::ObsRecord(emitter.data);
    let rinex = Rinex::new(header, record);

    let suffix = if rinex_version >= 3 { "rnx" } else { "rnx2" };
    let obs_path = format!("{file_path}.{suffix}");
    rinex.to_file(&obs_path).expect("unable to write observation file");
    info!("wrote observation file: {obs_path}");

    if emitter.any_epoch_invalid {
        info!("one or more epochs lacked an integer ambiguity; ranges are valid modulo 299792.458");
    }

    if !nav.gps.is_empty() {
        write_nav_file(NavCollector { gps: nav.gps.clone(), ..Default::default() }, file_path, "gps");
    }
    if !nav.glonass.is_empty() {
        write_nav_file(NavCollector { glonass: nav.glonass.clone(), ..Default::default() }, file_path, "glo");
    }
    if !nav.galileo.is_empty() {
        write_nav_file(NavCollector { galileo: nav.galileo.clone(), ..Default::default() }, file_path, "gal");
    }

    info!("complete! RINEX file output: {obs_path}");
}

fn write_nav_file(nav: NavCollector, file_path: &str, suffix: &str) {
    let record = build_nav_record(&nav);
    let header = Header::basic_nav();
    let rinex = Rinex::new(header, rinex::record::Record::NavRecord(record));
    let nav_path = format!("{file_path}.{suffix}.nav");
    match rinex.to_file(&nav_path) {
        Ok(()) => info!("wrote navigation file: {nav_path}"),
        Err(e) => info!("unable to write navigation file {nav_path}: {e}"),
    }
}

fn main() {
    env_logger::init();

    let matches = command().get_matches();

    match matches.subcommand() {
        Some(("convert", client_matches)) => {
            let file_path = client_matches.get_one::<String>("file_path").unwrap();
            let rinex_version = *client_matches.get_one::<u8>("rinex-version").unwrap();
            convert_file(file_path, rinex_version);
        }
        _ => {
            println!("Please use 'convert <rtcm file path>' command.");
            println!("Use --help for more information.");
        }
    }
}
