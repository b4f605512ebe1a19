pub mod dht11;
