//! Fixture networks shared by unit and integration tests.
//!
//! [`six_bus_network`] is the FR/ES study system:
//!
//! ```text
//!          ES    /    FR
//!          Ze ======= Ul
//!          |(PST)     |
//!          Ha ======= At
//!          |          |
//!          Aj <-HVDC- He      (two parallel circuits, He rectifies)
//! ```

use gridsens_core::{
    Branch, Bus, ConvertersMode, Generator, HvdcAngleDroopActivePowerControl, HvdcLine, Kilovolts,
    Load, Network, Ohms, PhaseTapChanger, Substation, Terminal, VoltageLevel, VscConverterStation,
};

pub const BUS_A: &str = "BUS_A";
pub const BUS_B: &str = "BUS_B";
pub const BUS_C: &str = "BUS_C";

/// Meshed triangle A-B-C at 400 kV, 150 MW from A to a load at C.
pub fn three_bus_network() -> Network {
    let mut network = Network::new("three_bus");
    network
        .add_substation(Substation::new("S", "FR"))
        .expect("substation");
    network
        .add_voltage_level(VoltageLevel::bus_breaker("VL", "S", Kilovolts(400.0)))
        .expect("voltage level");
    for bus in [BUS_A, BUS_B, BUS_C] {
        network.add_bus(Bus::new(bus, "VL")).expect("bus");
    }
    for (id, from, to) in [("L_AB", BUS_A, BUS_B), ("L_BC", BUS_B, BUS_C), ("L_AC", BUS_A, BUS_C)] {
        network
            .add_branch(Branch::line(
                id,
                Terminal::new("VL", from),
                Terminal::new("VL", to),
                Ohms(0.0),
                Ohms(16.0),
            ))
            .expect("line");
    }
    network
        .add_generator(
            Generator::new("G_A", Terminal::new("VL", BUS_A))
                .with_p_limits(0.0, 400.0)
                .with_target_p(150.0),
        )
        .expect("generator");
    network
        .add_generator(Generator::new("G_B", Terminal::new("VL", BUS_B)).with_p_limits(0.0, 100.0))
        .expect("generator");
    network
        .add_load(Load::new("LOAD_C", Terminal::new("VL", BUS_C), 150.0))
        .expect("load");
    network
}

pub const FR: &str = "FR";
pub const ES: &str = "ES";

pub const HVDC_1: &str = "HERA9AJAX1";
pub const HVDC_2: &str = "HERA9AJAX1bis";
pub const PST: &str = "NIREEL61ZEUS_ACLS";
pub const GENERATOR: &str = "ATHEN7G6_NGU_SM";
pub const AC_BORDER_NORTH: [&str; 2] = ["ZEUSL61ULYSS_ACLS", "ZEUSL62ULYSS_ACLS"];
pub const AC_BORDER_SOUTH: [&str; 2] = ["HADESL71ATHEN_ACLS", "HADESL72ATHEN_ACLS"];
pub const MONITORED: [&str; 2] = ["AJAXL71HADES_ACLS", "HADESL71ATHEN_ACLS"];

/// (voltage level, bus, country)
const SIX_BUS_NODES: [(&str, &str, &str); 6] = [
    ("ZEUS7", "ZEUS7_0", ES),
    ("HADES7", "HADES7_0", ES),
    ("AJAX7", "AJAX7_0", ES),
    ("ULYSS7", "ULYSS7_0", FR),
    ("ATHEN7", "ATHEN7_0", FR),
    ("HERA7", "HERA7_0", FR),
];

fn node_of(vl: &str) -> Terminal {
    Terminal::new(vl, format!("{vl}_0"))
}

/// The FR/ES study system with both HVDC circuits in AC emulation
/// (droop 100 MW/°, p0 150 MW, setpoint 150 MW).
pub fn six_bus_network() -> Network {
    let mut network = Network::new("6_bus_system");
    for (vl, bus, country) in SIX_BUS_NODES {
        let substation = vl.trim_end_matches('7');
        network
            .add_substation(Substation::new(substation, country))
            .expect("substation");
        network
            .add_voltage_level(VoltageLevel::bus_breaker(vl, substation, Kilovolts(400.0)))
            .expect("voltage level");
        network.add_bus(Bus::new(bus, vl)).expect("bus");
    }

    let lines = [
        ("ZEUSL61ULYSS_ACLS", "ZEUS7", "ULYSS7", 16.0),
        ("ZEUSL62ULYSS_ACLS", "ZEUS7", "ULYSS7", 16.0),
        ("HADESL71ATHEN_ACLS", "HADES7", "ATHEN7", 16.0),
        ("HADESL72ATHEN_ACLS", "HADES7", "ATHEN7", 16.0),
        ("AJAXL71HADES_ACLS", "AJAX7", "HADES7", 24.0),
        ("ULYSSL71ATHEN_ACLS", "ULYSS7", "ATHEN7", 24.0),
        ("ATHENL71HERA_ACLS", "ATHEN7", "HERA7", 24.0),
    ];
    for (id, from, to, x) in lines {
        network
            .add_branch(
                Branch::line(id, node_of(from), node_of(to), Ohms(0.5), Ohms(x))
                    .with_limit("permanent_limit", 2000.0)
                    .with_limit("IST", 2500.0),
            )
            .expect("line");
    }

    // 21 taps from -10° to +10°, neutral at tap 10
    let alphas: Vec<f64> = (0..21).map(|t| t as f64 - 10.0).collect();
    network
        .add_branch(
            Branch::transformer(PST, node_of("ZEUS7"), node_of("HADES7"), Ohms(0.2), Ohms(20.0))
                .with_phase_tap_changer(PhaseTapChanger::fixed(0, 10, &alphas))
                .with_limit("permanent_limit", 1500.0),
        )
        .expect("pst");

    for (station, vl) in [
        ("HERA9_VSC1", "HERA7"),
        ("HERA9_VSC2", "HERA7"),
        ("AJAX1_VSC1", "AJAX7"),
        ("AJAX1_VSC2", "AJAX7"),
    ] {
        let mut converter = VscConverterStation::new(station, node_of(vl));
        converter.loss_factor = 1.1;
        converter.voltage_regulator_on = true;
        network.add_converter_station(converter).expect("station");
    }
    for (id, s1, s2) in [(HVDC_1, "HERA9_VSC1", "AJAX1_VSC1"), (HVDC_2, "HERA9_VSC2", "AJAX1_VSC2")] {
        let mut hvdc = HvdcLine::new(id, s1, s2, ConvertersMode::Side1RectifierSide2Inverter)
            .with_target_p(150.0)
            .with_max_p(1000.0);
        hvdc.r = Ohms(1.5);
        network.add_hvdc_line(hvdc).expect("hvdc");
        network
            .extensions
            .hvdc_angle_droop
            .insert(id.to_string(), HvdcAngleDroopActivePowerControl::new(100.0, 150.0));
    }

    let generators = [
        ("ZEUS7G1_NGU_SM", "ZEUS7", 400.0, 1000.0),
        ("HADES7G1_NGU_SM", "HADES7", 300.0, 800.0),
        ("AJAX7G1_NGU_SM", "AJAX7", 200.0, 600.0),
        ("ULYSS7G1_NGU_SM", "ULYSS7", 500.0, 1000.0),
        (GENERATOR, "ATHEN7", 600.0, 1200.0),
        ("HERA7G1_NGU_SM", "HERA7", 300.0, 800.0),
    ];
    for (id, vl, target, max_p) in generators {
        network
            .add_generator(
                Generator::new(id, node_of(vl))
                    .with_p_limits(0.0, max_p)
                    .with_target_p(target),
            )
            .expect("generator");
    }

    let loads = [
        ("ZEUS7_LOAD", "ZEUS7", 600.0),
        ("HADES7_LOAD", "HADES7", 400.0),
        ("AJAX7_LOAD", "AJAX7", 500.0),
        ("ULYSS7_LOAD", "ULYSS7", 300.0),
        ("ATHEN7_LOAD", "ATHEN7", 300.0),
        ("HERA7_LOAD", "HERA7", 200.0),
    ];
    for (id, vl, p0) in loads {
        network
            .add_load(Load::new(id, node_of(vl), p0))
            .expect("load");
    }
    network
}

/// Set every generator and load of the network to zero, then apply `dispatch`.
pub fn redispatch(network: &mut Network, generators: &[(&str, f64)], loads: &[(&str, f64)]) {
    for gen in network.generators.values_mut() {
        gen.target_p = 0.0;
    }
    for load in network.loads.values_mut() {
        load.p0 = 0.0;
    }
    for (id, p) in generators {
        if let Some(gen) = network.generators.get_mut(*id) {
            gen.target_p = *p;
        }
    }
    for (id, p) in loads {
        if let Some(load) = network.loads.get_mut(*id) {
            load.p0 = *p;
        }
    }
}

/// Disable AC emulation on every HVDC line.
pub fn disable_droop(network: &mut Network) {
    for droop in network.extensions.hvdc_angle_droop.values_mut() {
        droop.enabled = false;
    }
}

pub fn approx_eq(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= 0.01 + 0.025 * expected.abs()
}
