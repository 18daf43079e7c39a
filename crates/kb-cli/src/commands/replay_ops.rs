use std::path::Path;

use super::die;
use crate::script::{load_script, replay, ReplayReport};

pub fn replay_cmd(script_file: &str, json: bool) {
    let script = die!(load_script(Path::new(script_file)), "Error: {}");
    let report = replay(&script);
    if json {
        let out = die!(serde_json::to_string_pretty(&report), "Error: {}");
        println!("{out}");
    } else {
        print_report(&report);
    }
}

fn print_report(report: &ReplayReport) {
    println!("text:        {:?}", report.text);
    println!("selection:   {:?}", report.selection);
    match report.composition {
        Some((start, end)) => println!("composition: {start}..{end}"),
        None => println!("composition: none"),
    }
    println!("composing:   {}", report.composing);
    println!("spec:        {}", report.spec);
    println!("requests:    {}", report.requests.join(", "));
    if report.unused_responses > 0 {
        println!("warning:     {} scripted response(s) unused", report.unused_responses);
    }
    println!();
    for (i, command) in report.commands.iter().enumerate() {
        println!("{i:>4}  {command}");
    }
}
