use std::time::Instant;

use anyhow::{Context, Result};
use vfr_core::{distance_nm, plan_route_with_config, PlannedRoute, RouteRequest};
use vfr_server::catalog_loader::load_catalog;
use vfr_server::config::Config;
use vfr_server::elevation::ElevationService;

#[derive(Clone)]
struct StressRoute {
    name: &'static str,
    origin: &'static str,
    destination: &'static str,
    max_leg_nm: f64,
    avoid_airspaces: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    let started = Instant::now();
    let catalog = load_catalog(&config)
        .with_context(|| format!("loading catalog from {}", config.airports_csv.display()))?;
    println!(
        "Catalog: {} nodes, {} edges, {} airspaces in {:.2?}",
        catalog.nodes().len(),
        catalog.graph().edge_count(),
        catalog.airspaces().len(),
        started.elapsed()
    );
    let elevation = ElevationService::from_config(&config);

    let routes = vec![
        StressRoute {
            name: "Palo Alto -> Oakland",
            origin: "KPAO",
            destination: "KOAK",
            max_leg_nm: 150.0,
            avoid_airspaces: false,
        },
        StressRoute {
            name: "Palo Alto -> Oakland, short legs",
            origin: "KPAO",
            destination: "KOAK",
            max_leg_nm: 10.0,
            avoid_airspaces: false,
        },
        StressRoute {
            name: "San Francisco -> Los Angeles",
            origin: "KSFO",
            destination: "KLAX",
            max_leg_nm: 120.0,
            avoid_airspaces: true,
        },
        StressRoute {
            name: "Seattle -> Boise",
            origin: "KSEA",
            destination: "KBOI",
            max_leg_nm: 100.0,
            avoid_airspaces: false,
        },
        StressRoute {
            name: "Zurich -> Geneva",
            origin: "LSZH",
            destination: "LSGG",
            max_leg_nm: 60.0,
            avoid_airspaces: true,
        },
    ];

    for route in routes {
        println!("\n=== {} ===", route.name);
        let request = RouteRequest {
            max_leg_distance: route.max_leg_nm,
            avoid_airspaces: route.avoid_airspaces,
            ..RouteRequest::new(route.origin, route.destination)
        };

        let started = Instant::now();
        let result =
            plan_route_with_config(&catalog, &elevation, &request, &config.planner).await;
        let elapsed = started.elapsed();
        let planned = match result {
            Ok(planned) => planned,
            Err(err) => {
                println!("Result: FAIL ({}) in {:.2?}", err, elapsed);
                continue;
            }
        };

        println!(
            "Result: OK in {:.2?} | points={} distance={:.1}nm time={:.2}h graph={} capped={}",
            elapsed,
            planned.points.len(),
            planned.distance_nm,
            planned.time_hr,
            planned.used_graph_route,
            planned.detour_capped
        );
        println!("Route: {}", planned.route.join(" "));

        let long_legs = legs_over_limit(&planned, request.leg_limit_nm());
        if long_legs.is_empty() {
            println!("Leg check: PASS");
        } else {
            println!("Leg check: FAIL ({})", long_legs.len());
            for leg in long_legs {
                println!(" - {}", leg);
            }
        }
    }
    Ok(())
}

fn legs_over_limit(route: &PlannedRoute, limit_nm: f64) -> Vec<String> {
    route
        .points
        .windows(2)
        .filter_map(|leg| {
            let distance = distance_nm(leg[0].position, leg[1].position);
            (distance > limit_nm).then(|| {
                format!(
                    "{} -> {} {:.1}nm > {:.1}nm",
                    leg[0].ident, leg[1].ident, distance, limit_nm
                )
            })
        })
        .collect()
}
