//! The `protoc` code generator plugin: reads a serialized
//! `CodeGeneratorRequest` from standard input and writes a serialized
//! `CodeGeneratorResponse` to standard output. Input problems are reported
//! through the response; a non-zero exit is reserved for internal I/O
//! failures before a response could be written.

use std::io::{Error, ErrorKind, Read, Result, Write};

use protoforge::Message;
use protoforge_build::descriptor::CodeGeneratorRequest;
use protoforge_build::Config;

fn main() {
    if let Err(error) = fallible_main() {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<()> {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;

    let request = CodeGeneratorRequest::decode(buf.as_slice()).map_err(|error| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("invalid CodeGeneratorRequest: {}", error),
        )
    })?;

    let response = Config::new().run_plugin(request);

    std::io::stdout().write_all(&response.encode_to_vec())?;
    Ok(())
}
