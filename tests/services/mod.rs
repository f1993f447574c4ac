mod test_catalog_engine;
mod test_script_service;
mod test_session_service;
