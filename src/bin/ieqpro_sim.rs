use std::error::Error;
use std::io::{self, Read, Write};

use ieqpro_proto::Simulator;

/// Run the simulated mount on stdin/stdout, e.g. behind `socat` to give it
/// a pseudo terminal.
fn sim_main_loop() -> Result<(), Box<dyn Error>> {
    let mut sim = Simulator::new();
    let mut stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        let mut data_in = [0; 1];
        if stdin.read(&mut data_in)? == 0 {
            break;
        }
        sim.receive_data(&data_in);
        if sim.has_output() {
            stdout.write_all(&sim.take_output())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    sim_main_loop()
}
