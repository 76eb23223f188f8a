//! Plan a VFR route through a running planner server and print the itinerary.

use anyhow::Result;
use clap::Parser;
use vfr_cli::{format_itinerary, PlannerClient};
use vfr_core::{RouteRequest, SpeedUnit};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Planner server URL
    #[arg(long, default_value = "http://localhost:8000")]
    url: String,

    /// Departure airport ident
    #[arg(long)]
    origin: String,

    /// Arrival airport ident
    #[arg(long)]
    destination: String,

    /// Cruise speed
    #[arg(long, default_value_t = 110.0)]
    speed: f64,

    /// Unit of --speed: knots, mph or kmh
    #[arg(long, default_value = "knots", value_parser = parse_speed_unit)]
    speed_unit: SpeedUnit,

    /// Planned cruise altitude in feet
    #[arg(long, default_value_t = 5500.0)]
    altitude: f64,

    /// Route around restricted airspace
    #[arg(long)]
    avoid_airspaces: bool,

    /// Skip nodes whose terrain is within 1000 ft of the cruise altitude
    #[arg(long)]
    avoid_terrain: bool,

    /// Longest leg in nm
    #[arg(long, default_value_t = 150.0)]
    max_leg: f64,

    /// Aircraft range in nm
    #[arg(long)]
    range: Option<f64>,

    /// Only divert to airports selling fuel
    #[arg(long)]
    fuel_stops_only: bool,

    /// Print the raw JSON response
    #[arg(long)]
    json: bool,
}

fn parse_speed_unit(value: &str) -> Result<SpeedUnit, String> {
    match value.trim().to_lowercase().as_str() {
        "knots" | "kt" | "kts" => Ok(SpeedUnit::Knots),
        "mph" => Ok(SpeedUnit::Mph),
        "kmh" | "km/h" => Ok(SpeedUnit::Kmh),
        other => Err(format!("unknown speed unit '{}'", other)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let client = PlannerClient::new(&args.url);

    let request = RouteRequest {
        speed: args.speed,
        speed_unit: args.speed_unit,
        altitude: args.altitude,
        avoid_airspaces: args.avoid_airspaces,
        avoid_terrain: args.avoid_terrain,
        max_leg_distance: args.max_leg,
        aircraft_range_nm: args.range,
        fuel_stops_only: args.fuel_stops_only,
        ..RouteRequest::new(args.origin, args.destination)
    };

    let route = client.plan_route(&request)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&route)?);
    } else {
        print!("{}", format_itinerary(&route));
    }
    Ok(())
}
