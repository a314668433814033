pub mod udp_message;
