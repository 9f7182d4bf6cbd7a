//! GraphQL documents sent to the Tibber API.

/// All homes of the authenticated user, with address and features.
pub const HOMES_QUERY: &str = r#"{
  viewer {
    homes {
      id
      appNickname
      size
      type
      numberOfResidents
      primaryHeatingSource
      hasVentilationSystem
      mainFuseSize
      features {
        realTimeConsumptionEnabled
      }
      address {
        address1
        address2
        address3
        postalCode
        city
        country
        latitude
        longitude
      }
    }
  }
}"#;

/// Current, today's and tomorrow's prices for every home.
pub const PRICES_QUERY: &str = r#"{
  viewer {
    homes {
      id
      currentSubscription {
        priceInfo {
          current { total energy tax startsAt level currency }
          today { total energy tax startsAt level currency }
          tomorrow { total energy tax startsAt level currency }
        }
      }
    }
  }
}"#;

/// Real-time measurements for one home. Variables: `homeId`.
pub const LIVE_MEASUREMENT_SUBSCRIPTION: &str = r#"subscription($homeId: ID!) {
  liveMeasurement(homeId: $homeId) {
    timestamp
    power
    powerProduction
    accumulatedConsumption
    accumulatedProduction
    accumulatedCost
    accumulatedReward
    minPower
    maxPower
    averagePower
    voltagePhase1
    voltagePhase2
    voltagePhase3
    currentL1
    currentL2
    currentL3
    currency
  }
}"#;
