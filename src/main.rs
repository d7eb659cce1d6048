use modesweep::settings::{self};
use modesweep::sweep::Sweep;

fn main() {
    let settings = settings::load_config().unwrap();
    let mut sweep = Sweep::new(settings);

    sweep.solve().unwrap();
    sweep.writeup();
}
