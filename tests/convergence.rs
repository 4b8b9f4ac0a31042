//! Order-of-accuracy checks against closed-form solutions.

use odesolve::benchmark::{Exponential, MassSpring};
use odesolve::prelude::*;
use odesolve::{run, solve_ode_cn, solve_ode_ee, solve_ode_ie, Scheme, State};

fn oscillator_state() -> State {
    State::from_parts(
        VectorD::from_vec(vec![1.]),
        VectorD::zeros(1),
        VectorD::from_vec(vec![-1.]),
    )
    .expect("consistent state")
}

/// Final-time error of the unit oscillator `x(t) = cos(t)` at `t = 1`.
fn oscillator_error(scheme: Scheme, steps: usize) -> f64 {
    let system = MassSpring::new(1, 1., 1.);
    let trajectory =
        run(scheme, &system, None, &oscillator_state(), 1., steps).expect("run failed");
    let last = trajectory.last();
    let e_x = last.x[0] - 1.0_f64.cos();
    let e_dx = last.dx[0] + 1.0_f64.sin();
    (e_x * e_x + e_dx * e_dx).sqrt()
}

fn error_ratio(scheme: Scheme) -> f64 {
    let coarse = oscillator_error(scheme, 100);
    let fine = oscillator_error(scheme, 200);
    coarse / fine
}

#[test]
fn test_explicit_euler_is_first_order() {
    let ratio = error_ratio(Scheme::ExplicitEuler);
    assert!(
        (1.6..2.5).contains(&ratio),
        "expected first-order halving, got ratio {ratio}"
    );
}

#[test]
fn test_implicit_euler_is_first_order() {
    let ratio = error_ratio(Scheme::ImplicitEuler);
    assert!(
        (1.6..2.5).contains(&ratio),
        "expected first-order halving, got ratio {ratio}"
    );
}

#[test]
fn test_crank_nicolson_is_second_order() {
    let ratio = error_ratio(Scheme::CrankNicolson);
    assert!(
        (3.3..4.9).contains(&ratio),
        "expected second-order halving, got ratio {ratio}"
    );
}

#[test]
fn test_generalized_alpha_is_second_order() {
    let ratio = error_ratio(Scheme::GeneralizedAlpha { rho_inf: 0.8 });
    assert!(
        (3.0..5.2).contains(&ratio),
        "expected second-order halving, got ratio {ratio}"
    );
}

#[test]
fn test_all_schemes_converge_on_oscillator() {
    for scheme in [
        Scheme::ExplicitEuler,
        Scheme::ImplicitEuler,
        Scheme::CrankNicolson,
        Scheme::GeneralizedAlpha { rho_inf: 0.8 },
    ] {
        let error = oscillator_error(scheme, 2000);
        assert!(
            error < 5e-3,
            "{}: error {error} too large at fine resolution",
            scheme.name()
        );
    }
}

/// All three classic schemes approach `y0 e^{lambda t}` as dt shrinks.
#[test]
fn test_exponential_convergence() {
    type Solve = fn(
        f64,
        usize,
        &mut VectorD,
        &dyn odesolve::system::VectorField,
        Option<odesolve::driver::StepCallback<'_>>,
    ) -> Result<(), Error>;

    let cases: [(&str, Solve); 3] = [
        ("explicit Euler", solve_ode_ee),
        ("implicit Euler", solve_ode_ie),
        ("Crank-Nicolson", solve_ode_cn),
    ];
    let system = Exponential::new(-1.);
    let exact = (-1.0_f64).exp();

    for (name, solve) in cases {
        let mut errors = Vec::new();
        for steps in [50, 400] {
            let mut y = VectorD::from_vec(vec![1.]);
            solve(1., steps, &mut y, &system, None).expect("solve failed");
            errors.push((y[0] - exact).abs());
        }
        assert!(errors[0] < 0.05, "{name}: coarse error {} too large", errors[0]);
        assert!(
            errors[1] < errors[0] / 4.,
            "{name}: error did not shrink with dt ({} vs {})",
            errors[1],
            errors[0]
        );
    }
}
