pub mod ny_market;
