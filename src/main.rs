use std::fs;
use std::io::{self, prelude::*};
use std::path;
use std::process;

use bytesize::ByteSize;
use env_logger;
use log;

use binsort::{ExternalSorterBuilder, Signedness};

fn main() {
    let arg_parser = build_arg_parser();

    init_logger(arg_parser.value_of("log_level").expect("value has a default"));

    let width: usize = arg_parser
        .value_of("bytes")
        .expect("value has a default")
        .parse()
        .expect("value is pre-validated");
    let chunk_capacity = arg_parser
        .value_of("chunk_size")
        .expect("value has a default")
        .parse::<ByteSize>()
        .expect("value is pre-validated")
        .as_u64() as usize;
    let signedness = if arg_parser.is_present("unsigned") {
        Signedness::Unsigned
    } else {
        Signedness::Signed
    };

    let input = arg_parser.value_of("input");
    let output = match (arg_parser.value_of("output"), input) {
        (Some(output), _) => output.to_string(),
        (None, Some(input)) => format!("{}.sorted", input),
        (None, None) => {
            log::error!("--output is required when reading standard input");
            process::exit(1);
        }
    };

    let input_stream: Box<dyn Read> = match input {
        Some(path) => match fs::File::open(path) {
            Ok(file) => Box::new(io::BufReader::new(file)),
            Err(err) => {
                log::error!("input file opening error: {}", err);
                process::exit(1);
            }
        },
        None => Box::new(io::stdin().lock()),
    };

    let mut output_stream = match fs::File::create(&output) {
        Ok(file) => io::BufWriter::new(file),
        Err(err) => {
            log::error!("output file creation error: {}", err);
            process::exit(1);
        }
    };

    let mut sorter_builder = ExternalSorterBuilder::new()
        .with_record_width(width)
        .with_signedness(signedness)
        .with_chunk_capacity(chunk_capacity);

    if let Some(tmp_dir) = arg_parser.value_of("tmp_dir") {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    match sorter.sort(input_stream, &mut output_stream) {
        Ok(records) => log::debug!("{} records written to {}", records, output),
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("binsort")
        .about("external sorter for fixed-width binary integer records")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file to be sorted; standard input if omitted")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file; defaults to the input name plus a .sorted suffix")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("bytes")
                .short('b')
                .long("bytes")
                .help("record width in bytes")
                .takes_value(true)
                .default_value("8")
                .validator(|v| match v.parse::<usize>() {
                    Ok(1) | Ok(2) | Ok(4) | Ok(8) => Ok(()),
                    Ok(n) => Err(format!("record width must be 1, 2, 4 or 8 bytes, got {}", n)),
                    Err(err) => Err(format!("record width incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("unsigned")
                .short('u')
                .long("unsigned")
                .help("interpret records as unsigned integers"),
        )
        .arg(
            clap::Arg::new("chunk_size")
                .short('c')
                .long("chunk-size")
                .help("chunk buffer size")
                .takes_value(true)
                .default_value("32MiB")
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("chunk size format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store run files")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(["off", "error", "warn", "info", "debug", "trace"]),
        )
        .get_matches()
}

fn init_logger(level: &str) {
    env_logger::Builder::new()
        .filter_level(level.parse().expect("value is pre-validated"))
        .format_timestamp_millis()
        .init();
}
