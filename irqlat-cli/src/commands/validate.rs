// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `irqlat validate` command - Validate configuration file.

use irqlat_core::{ConfigLoader, WaitPolicy};

use super::CommandResult;

pub fn execute(file: &str) -> CommandResult {
    tracing::info!(file = %file, "Validating configuration");

    let config = ConfigLoader::load_file(file)?;

    println!("✓ Configuration is valid");
    println!();
    println!("Devices:");
    println!("  Memory:        {}", config.devices.memory.display());
    println!("  Interrupt:     {}", config.devices.interrupt.display());
    println!("  Accounting:    {}", config.devices.accounting.display());
    println!();
    println!("Measurement:");
    println!("  Register:      {}", config.measurement.register_address);
    println!("  Pin:           {}", config.measurement.pin.value());
    println!("  Sets:          {}", config.measurement.sets);
    println!("  Samples:       {}", config.measurement.samples);
    println!("  IRQ prefix:    {}", config.measurement.accounting_prefix);
    match config.measurement.wait {
        WaitPolicy::Unbounded => println!("  Wait deadline: none"),
        WaitPolicy::Deadline(d) => println!("  Wait deadline: {}ms", d.as_millis()),
    }
    println!();
    println!("Result log:      {}", config.result_log.display());
    Ok(())
}
