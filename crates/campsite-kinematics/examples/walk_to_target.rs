use campsite_kinematics::*;

fn main() {
    let speed = 3.5;
    let mass_result = PointMass::new(speed);

    let mut position = Vec2::new(0.0, 0.0);
    let target = Vec2::new(2.0, 1.0);
    let dt = 0.02; // Fixed step in seconds
    let max_steps = 100;

    match mass_result {
        Ok(mass) => {
            println!("Initializing walk...");
            println!("  {}", mass);
            println!("  Start:  {}", position);
            println!("  Target: {}", target);
            println!("  Fixed step: {} s", dt);

            for i in 0..max_steps {
                match mass.step_towards(position, target, dt) {
                    Ok(step) => {
                        position = step.position;
                        let facing = step.direction.and_then(Facing::from_direction);
                        println!(
                            "Step {:>3}: {} facing {}",
                            i + 1,
                            position,
                            facing.map_or("-".to_string(), |f| f.to_string())
                        );
                        if step.direction.is_none() || position.distance(target) <= 1e-4 {
                            break;
                        }
                    }
                    Err(e) => {
                        eprintln!("Error during step {}: {:?}", i + 1, e);
                        break;
                    }
                }
            }

            println!("\nArrived at {} after {:.2} s planned.", position, mass.travel_time(Vec2::ZERO.distance(target)));
        }
        Err(e) => {
            eprintln!("Failed to initialize point mass: {:?}", e);
            eprintln!("Please ensure speed ({}) is positive.", speed);
        }
    }
}
