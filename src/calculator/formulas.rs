//! The four supported formulas
//!
//! Each function is total over finite inputs: zero and negative values never
//! panic or divide by zero, degenerate cases map to +∞ instead.

use super::CalculationResult;

fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

//
// ================= Unit Economics =================
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitEconomicsInputs {
    pub monthly_revenue_per_customer: f64,
    pub average_customer_lifespan_months: f64,
    pub customer_acquisition_cost: f64,
    pub monthly_variable_cost_per_customer: f64,
}

pub fn unit_economics(inputs: &UnitEconomicsInputs) -> CalculationResult {
    let monthly_profit =
        inputs.monthly_revenue_per_customer - inputs.monthly_variable_cost_per_customer;
    let lifetime_value = monthly_profit * inputs.average_customer_lifespan_months;

    let ratio = if inputs.customer_acquisition_cost > 0.0 {
        lifetime_value / inputs.customer_acquisition_cost
    } else {
        f64::INFINITY
    };

    let payback_months = if monthly_profit > 0.0 {
        inputs.customer_acquisition_cost / monthly_profit
    } else {
        f64::INFINITY
    };

    // Priority order matters: ratio checks win over payback checks.
    let (rating, assessment) = if ratio < 1.0 {
        (
            "critical",
            "Critical: each customer costs more to acquire than they will ever return. \
             This model does not work until customer value goes up or acquisition cost comes down.",
        )
    } else if ratio < 3.0 {
        (
            "concerning",
            "Concerning: LTV:CAC is under the 3:1 benchmark. Raise lifetime value \
             (pricing, retention, upsells) or find cheaper acquisition channels.",
        )
    } else if payback_months > 18.0 {
        (
            "warning",
            "Warning: the unit economics are positive but payback takes more than 18 months, \
             so growth will be capital-intensive. Look for ways to collect revenue sooner or cut CAC.",
        )
    } else if payback_months <= 12.0 {
        (
            "healthy",
            "Healthy: strong LTV:CAC with a reasonable payback period. \
             Validate these assumptions against real customer data as you scale.",
        )
    } else {
        (
            "moderate",
            "Moderate: workable numbers but nothing exceptional. Keep refining as data comes in \
             and look for gains in customer value or acquisition efficiency.",
        )
    };

    CalculationResult::new(
        vec![
            ("lifetimeValue", round_to(lifetime_value, 2)),
            ("ltvCacRatio", round_to(ratio, 2)),
            ("paybackPeriodMonths", round_to(payback_months, 1)),
            ("monthlyProfitPerCustomer", round_to(monthly_profit, 2)),
        ],
        rating,
        assessment,
    )
}

//
// ================= Market Sizing =================
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSizeInputs {
    pub total_addressable_market: f64,
    /// Share of TAM that can be served, 0-100
    pub serviceable_percent: f64,
    /// Share of SAM that can realistically be captured, 0-100
    pub obtainable_percent: f64,
}

pub fn tam_sam_som(inputs: &MarketSizeInputs) -> CalculationResult {
    let sam = inputs.total_addressable_market * (inputs.serviceable_percent / 100.0);
    let som = sam * (inputs.obtainable_percent / 100.0);

    let (rating, assessment) = if som < 1_000_000.0 {
        (
            "small",
            "Small market: the obtainable market points to a lifestyle business more than a \
             venture-scale one. That is fine if it is the goal, but most VCs want bigger. \
             Consider widening the target market or bootstrapping.",
        )
    } else if som < 10_000_000.0 {
        (
            "moderate",
            "Moderate market: enough for a solid $1-10M revenue business. Venture money will be \
             hard to raise, but angels or a bootstrapped path can work well.",
        )
    } else if som < 100_000_000.0 {
        (
            "good",
            "Good market size: large enough to interest venture investors if team, traction \
             and differentiation line up. Show that you can actually capture it.",
        )
    } else {
        (
            "large",
            "Large market: size is not the constraint, execution is. With a $100M+ SOM, focus on \
             differentiation, team and early traction.",
        )
    };

    CalculationResult::new(
        vec![
            ("tam", inputs.total_addressable_market),
            ("sam", round_to(sam, 0)),
            ("som", round_to(som, 0)),
        ],
        rating,
        assessment,
    )
}

//
// ================= Break-even =================
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakEvenInputs {
    pub monthly_fixed_costs: f64,
    pub price_per_unit: f64,
    pub variable_cost_per_unit: f64,
}

pub fn break_even(inputs: &BreakEvenInputs) -> CalculationResult {
    let margin = inputs.price_per_unit - inputs.variable_cost_per_unit;

    // Unit and revenue figures are meaningless without a positive margin.
    if margin <= 0.0 {
        return CalculationResult::new(
            vec![("contributionMarginPerUnit", round_to(margin, 2))],
            "critical",
            "Critical: the price does not cover variable costs, so every sale loses money and \
             cannot break even at any volume. Raise the price or cut variable costs first.",
        );
    }

    let units = (inputs.monthly_fixed_costs / margin).ceil();
    let revenue = units * inputs.price_per_unit;
    let shown = units as i64;

    let (rating, assessment) = if units <= 10.0 {
        (
            "low",
            format!(
                "Low break-even: only {} sales per month cover fixed costs. \
                 That is achievable and leaves room to experiment.",
                shown
            ),
        )
    } else if units <= 100.0 {
        (
            "moderate",
            format!(
                "Moderate break-even: {} sales per month is reachable with steady sales effort. \
                 Build repeatable acquisition channels.",
                shown
            ),
        )
    } else if units <= 1000.0 {
        (
            "high",
            format!(
                "High break-even: {} sales per month needs real volume. \
                 Make sure acquisition can scale before committing to this cost structure.",
                shown
            ),
        )
    } else {
        (
            "very_high",
            format!(
                "Very high break-even: {} sales per month is a high bar. \
                 Look at reducing fixed costs or improving price and margin.",
                shown
            ),
        )
    };

    CalculationResult::new(
        vec![
            ("contributionMarginPerUnit", round_to(margin, 2)),
            ("breakEvenUnitsPerMonth", units),
            ("breakEvenRevenuePerMonth", round_to(revenue, 2)),
        ],
        rating,
        assessment,
    )
}

//
// ================= Runway =================
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunwayInputs {
    pub current_cash: f64,
    pub monthly_burn_rate: f64,
    pub monthly_revenue: f64,
}

pub fn runway(inputs: &RunwayInputs) -> CalculationResult {
    let net_burn = inputs.monthly_burn_rate - inputs.monthly_revenue;

    if net_burn <= 0.0 {
        return CalculationResult::new(
            vec![
                ("netMonthlyBurn", round_to(net_burn, 2)),
                ("runwayMonths", f64::INFINITY),
            ],
            "profitable",
            "Profitable or at break-even: runway is not a constraint. \
             Put the focus on growth and reinvestment.",
        );
    }

    let months = inputs.current_cash / net_burn;

    let (rating, assessment) = if months < 3.0 {
        (
            "critical",
            "Critical: under 3 months of runway. Revenue, deep cost cuts or closing funding \
             must happen now; fundraising alone usually takes 3-6 months.",
        )
    } else if months < 6.0 {
        (
            "urgent",
            "Urgent: under 6 months of runway. Start fundraising or a major revenue push today, \
             these take longer than expected.",
        )
    } else if months < 12.0 {
        (
            "moderate",
            "Moderate: some time, but work on extending runway now. Open investor conversations \
             or push toward profitability.",
        )
    } else if months < 18.0 {
        (
            "comfortable",
            "Comfortable: 12-18 months leaves room to experiment and iterate. \
             Spend it on finding product-market fit and repeatable growth.",
        )
    } else {
        (
            "strong",
            "Strong: 18+ months of runway. There is time to be deliberate and take calculated risks.",
        )
    };

    CalculationResult::new(
        vec![
            ("netMonthlyBurn", round_to(net_burn, 2)),
            ("runwayMonths", round_to(months, 1)),
        ],
        rating,
        assessment,
    )
}
